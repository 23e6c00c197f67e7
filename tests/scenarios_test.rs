//! Whole-pipeline behaviour on small in-memory crates.

use clap::Parser;
use openapi_from_comments::{
    cli::{self, CliArgs},
    declaration::DeclarationTable,
    diagnostics::Diagnostics,
    error::Error,
    generator::{Generation, Generator},
    module_path::{ModulePath, QualifiedName},
    operation::HttpMethod,
    parser::{AstParser, ParsedFile},
    schema_generator::{Schema, SchemaGenerator, SchemaKind},
    type_resolver::TypeResolver,
};
use pretty_assertions::assert_eq;
use std::ffi::OsString;
use std::path::Path;
use tempfile::TempDir;

fn parse(path: &str, module: &[&str], code: &str) -> ParsedFile {
    AstParser::parse_str(
        Path::new(path),
        ModulePath::from_segments(module.iter().copied()),
        code,
    )
    .expect("Failed to parse test source")
}

fn generate(code: &str) -> Generation {
    Generator::new()
        .generate(&[parse("src/lib.rs", &[], code)])
        .expect("Generation should succeed")
}

fn schema<'a>(generation: &'a Generation, name: &str) -> &'a Schema {
    &generation
        .document
        .components
        .as_ref()
        .expect("Document should have components")
        .schemas[name]
}

fn component_names(generation: &Generation) -> Vec<String> {
    generation
        .document
        .components
        .as_ref()
        .map(|c| c.schemas.keys().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn test_nested_struct_becomes_reference() {
    let generation = generate(
        r#"
        /// openapi:schema
        pub struct Category { pub id: i32, pub name: String }

        /// openapi:schema
        pub struct Pet { pub name: String, pub category: Category }
        "#,
    );

    assert_eq!(component_names(&generation), vec!["Category", "Pet"]);
    assert_eq!(
        schema(&generation, "Pet").properties["category"],
        Schema::reference("Category")
    );
    assert_eq!(
        schema(&generation, "Category").properties["id"],
        Schema {
            kind: Some(SchemaKind::Integer),
            format: Some("int32".to_string()),
            ..Schema::default()
        }
    );
}

#[test]
fn test_trait_method_becomes_single_operation() {
    let generation = generate(
        r#"
        /// openapi:schema
        pub struct Pet { pub name: String }

        pub trait PetApi {
            /// openapi:operation GET /pets/{id} getPet
            /// openapi:response 200 Pet
            fn get_pet(&self, id: i64) -> Pet;
        }
        "#,
    );
    let document = &generation.document;

    assert_eq!(document.operation_count(), 1);
    let operation = document.operation("/pets/{id}", HttpMethod::Get).unwrap();
    assert_eq!(
        operation.responses["200"].content["application/json"].schema,
        Schema::reference("Pet")
    );
}

#[test]
fn test_one_of_composition_discards_inferred_type() {
    let generation = generate(
        r#"
        /// openapi:schema
        pub struct Cat { pub purrs: bool }

        /// openapi:schema
        pub struct Dog { pub barks: bool }

        /// openapi:schema
        pub struct Pet {
            /// openapi:oneOf Cat Dog
            pub animal: Dog,
        }
        "#,
    );

    let animal = &schema(&generation, "Pet").properties["animal"];
    assert_eq!(animal.reference, None);
    assert_eq!(
        animal.one_of,
        vec![Schema::reference("Cat"), Schema::reference("Dog")]
    );
}

#[test]
fn test_one_of_member_that_is_not_a_schema_is_dropped() {
    let generation = generate(
        r#"
        /// openapi:schema
        pub struct Cat { pub purrs: bool }

        pub struct Ghost { pub boo: bool }

        /// openapi:schema
        pub struct Pet {
            /// openapi:oneOf Cat Ghost
            pub animal: serde_json::Value,
        }
        "#,
    );

    assert_eq!(
        schema(&generation, "Pet").properties["animal"].one_of,
        vec![Schema::reference("Cat")]
    );
    assert!(generation
        .diagnostics
        .warnings()
        .any(|d| d.message.contains("Ghost")));
    assert!(!component_names(&generation).contains(&"Ghost".to_string()));
}

#[test]
fn test_unterminated_description_block_is_dropped() {
    let generation = generate(
        r#"
        /// openapi:schema
        /// openapi:description start
        /// A pet with a long story
        /// that never ends
        pub struct Pet { pub name: String }
        "#,
    );

    assert_eq!(schema(&generation, "Pet").description, None);
    assert!(generation.diagnostics.contains("unterminated"));
}

#[test]
fn test_repeated_resolution_is_interned() {
    let parsed = parse(
        "src/lib.rs",
        &[],
        r#"
        /// openapi:schema
        pub struct Tag { pub name: String }

        /// openapi:schema
        pub struct Pet { pub tags: Vec<Tag>, pub primary: Tag }
        "#,
    );
    let mut diagnostics = Diagnostics::new();
    let table = DeclarationTable::extract(&[parsed], &mut diagnostics).unwrap();
    let mut schemas = SchemaGenerator::new(TypeResolver::new(table));
    let tag = QualifiedName::new(ModulePath::root(), "Tag");

    let first = schemas.synthesize(&tag).unwrap();
    schemas.synthesize_all();
    let second = schemas.synthesize(&tag).unwrap();

    assert_eq!(first, second);
    assert_eq!(schemas.len(), 2);
    assert_eq!(schemas.node(first).name, "Tag");
}

#[test]
fn test_cycles_terminate_with_references() {
    let generation = generate(
        r#"
        /// openapi:schema
        pub struct Node {
            pub value: String,
            pub next: Option<Box<Node>>,
            pub children: Vec<Node>,
            pub owner: Owner,
        }

        /// openapi:schema
        pub struct Owner { pub root: std::sync::Arc<Node> }
        "#,
    );

    let node = schema(&generation, "Node");
    assert_eq!(node.properties["next"], Schema::reference("Node"));
    assert_eq!(node.properties["children"], Schema::array(Schema::reference("Node")));
    assert_eq!(node.properties["owner"], Schema::reference("Owner"));
    assert_eq!(schema(&generation, "Owner").properties["root"], Schema::reference("Node"));
}

#[test]
fn test_unflagged_types_stay_out_of_components() {
    let generation = generate(
        r#"
        pub struct Owner { pub name: String }

        /// openapi:schema
        pub struct Pet { pub owner: Owner }
        "#,
    );

    assert_eq!(component_names(&generation), vec!["Pet"]);
    let owner = &schema(&generation, "Pet").properties["owner"];
    assert_eq!(owner.kind, Some(SchemaKind::Object));
    assert_eq!(owner.reference, None);
}

#[test]
fn test_explicit_format_overrides_inferred_format() {
    let generation = generate(
        r#"
        /// openapi:schema
        pub struct Counter {
            /// openapi:format int64
            pub count: i32,
            /// openapi:example 7
            pub step: u8,
        }
        "#,
    );

    let counter = schema(&generation, "Counter");
    assert_eq!(counter.properties["count"].format.as_deref(), Some("int64"));
    assert_eq!(counter.properties["step"].example, Some(serde_json::json!(7)));
}

#[test]
fn test_required_set_follows_serde_attributes() {
    let generation = generate(
        r#"
        /// openapi:schema
        pub struct Pet {
            pub name: String,
            pub nickname: Option<String>,
            #[serde(default)]
            pub tags: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            pub photos: Vec<String>,
            /// openapi:nullable
            pub age: u8,
        }
        "#,
    );

    assert_eq!(schema(&generation, "Pet").required, vec!["name", "age"]);
}

#[test]
fn test_same_path_and_verb_keeps_last_operation() {
    let generation = Generator::new()
        .generate(&[
            parse(
                "src/a.rs",
                &["a"],
                "/// openapi:operation GET /pets listPets\npub fn list_pets() {}",
            ),
            parse(
                "src/b.rs",
                &["b"],
                "/// openapi:operation GET /pets listPetsV2\npub fn list_pets_v2() {}",
            ),
        ])
        .unwrap();

    let operation = generation.document.operation("/pets", HttpMethod::Get).unwrap();
    assert_eq!(operation.operation_id, "listPetsV2");
    assert_eq!(generation.document.operation_count(), 1);
    assert!(generation.diagnostics.contains("overwritten"));
}

#[test]
fn test_incomplete_operation_is_dropped_not_fatal() {
    let generation = generate(
        r#"
        /// openapi:method GET
        /// openapi:route /pets
        pub fn list_pets() {}

        /// openapi:operation GET /health health
        pub fn health() {}
        "#,
    );

    assert_eq!(generation.document.operation_count(), 1);
    assert!(generation
        .diagnostics
        .errors()
        .any(|d| d.subject == "list_pets" && d.message.contains("operation id")));
}

#[test]
fn test_redeclared_type_aborts_generation() {
    let result = Generator::new().generate(&[
        parse("src/models.rs", &["models"], "/// openapi:schema\npub struct Pet;"),
        parse("src/models/mod.rs", &["models"], "pub struct Pet;"),
    ]);

    assert!(matches!(result, Err(Error::Redeclaration { .. })));
}

#[test]
fn test_unparseable_source_fails_the_command() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("good.rs"), "/// openapi:schema\npub struct Pet;\n").unwrap();
    std::fs::write(temp_dir.path().join("broken.rs"), "pub fn broken( {\n").unwrap();
    let output = temp_dir.path().join("openapi.yaml");

    let args = CliArgs::try_parse_from(vec![
        OsString::from("openapi-from-comments"),
        temp_dir.path().into(),
        "-o".into(),
        output.clone().into(),
    ])
    .unwrap();

    assert!(cli::run(args).is_err());
    assert!(!output.exists());
}

#[test]
fn test_imported_value_stays_free_form_beside_unrelated_value_type() {
    let generation = Generator::new()
        .generate(&[
            parse(
                "src/lib.rs",
                &[],
                r#"
                use serde_json::Value;

                /// openapi:schema
                pub struct Setting { pub value: Value }
                "#,
            ),
            parse(
                "src/ledger.rs",
                &["ledger"],
                "/// openapi:schema\npub struct Value { pub amount: i64 }",
            ),
        ])
        .unwrap();

    assert_eq!(schema(&generation, "Setting").properties["value"], Schema::default());
}

#[test]
fn test_response_names_local_value_type() {
    let generation = generate(
        r#"
        /// openapi:schema
        pub struct Value { pub amount: i64 }

        /// openapi:operation GET /value getValue
        /// openapi:response 200 Value
        pub fn get_value() {}
        "#,
    );

    let operation = generation.document.operation("/value", HttpMethod::Get).unwrap();
    assert_eq!(
        operation.responses["200"].content["application/json"].schema,
        Schema::reference("Value")
    );
    assert_eq!(component_names(&generation), vec!["Value"]);
}
