use crate::annotation::{lex, ContainerAnnotations, ExternalDocs, FieldAnnotations};
use crate::declaration::{Declaration, DeclarationKind, FieldDecl, VariantDecl};
use crate::diagnostics::Diagnostics;
use crate::module_path::{ModulePath, QualifiedName};
use crate::type_resolver::{PrimitiveType, TypeExpr, TypeResolver};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Prefix of every component reference
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// JSON Schema `type` keyword values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xml {
    pub name: String,
}

/// OpenAPI Schema Object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to a component schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchemaKind>,
    /// Format for primitive types (e.g., "int32", "date-time", "uuid")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Properties for object types, in declaration order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Value schema for map types
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml: Option<Xml>,
    #[serde(rename = "externalDocs", skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

impl Schema {
    pub fn of(kind: SchemaKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    fn formatted(kind: SchemaKind, format: &str) -> Self {
        Self {
            format: Some(format.to_string()),
            ..Self::of(kind)
        }
    }

    /// `{"$ref": "#/components/schemas/<name>"}`
    pub fn reference(component: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", COMPONENTS_PREFIX, component)),
            ..Self::default()
        }
    }

    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of(SchemaKind::Array)
        }
    }

    pub fn map(values: Schema) -> Self {
        Self {
            additional_properties: Some(Box::new(values)),
            ..Self::of(SchemaKind::Object)
        }
    }

    pub fn primitive(primitive: PrimitiveType) -> Self {
        use PrimitiveType::*;
        match primitive {
            String | Char => Self::of(SchemaKind::String),
            I8 | I16 | I32 | U8 | U16 | U32 => Self::formatted(SchemaKind::Integer, "int32"),
            I64 | I128 | Isize | U64 | U128 | Usize => Self::formatted(SchemaKind::Integer, "int64"),
            F32 => Self::formatted(SchemaKind::Number, "float"),
            F64 => Self::formatted(SchemaKind::Number, "double"),
            Bool => Self::of(SchemaKind::Boolean),
            Bytes => Self::formatted(SchemaKind::String, "byte"),
            DateTime => Self::formatted(SchemaKind::String, "date-time"),
            Date => Self::formatted(SchemaKind::String, "date"),
            Uuid => Self::formatted(SchemaKind::String, "uuid"),
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// Index of a node in the schema registry
pub type SchemaId = usize;

/// One interned component schema.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub canonical_name: QualifiedName,
    /// Component name used in `$ref`
    pub name: String,
    pub schema: Schema,
}

/// Component names, assigned once per canonical name.
#[derive(Debug, Default)]
struct NameAllocator {
    assigned: HashMap<QualifiedName, String>,
    by_exposed: HashMap<String, QualifiedName>,
}

impl NameAllocator {
    fn assign(&mut self, canonical: &QualifiedName, preferred: &str, diagnostics: &mut Diagnostics) -> String {
        if let Some(name) = self.assigned.get(canonical) {
            return name.clone();
        }

        let mut name = preferred.to_string();
        if let Some(holder) = self.by_exposed.get(&name) {
            let qualified = format!("{}.{}", canonical.module.dotted(), preferred);
            let mut candidate = qualified.clone();
            let mut suffix = 2;
            while self.by_exposed.contains_key(&candidate) {
                candidate = format!("{}{}", qualified, suffix);
                suffix += 1;
            }
            diagnostics.warn(
                canonical.to_string(),
                format!(
                    "component name `{}` is already used by {}; using `{}`",
                    preferred, holder, candidate
                ),
            );
            name = candidate;
        }

        self.by_exposed.insert(name.clone(), canonical.clone());
        self.assigned.insert(canonical.clone(), name.clone());
        name
    }

    fn get(&self, canonical: &QualifiedName) -> Option<&String> {
        self.assigned.get(canonical)
    }

    fn lookup(&self, exposed: &str) -> Option<&QualifiedName> {
        self.by_exposed.get(exposed)
    }
}

/// Schema generator - turns opted-in declarations into interned component schemas.
///
/// One generator is the per-run context: it owns the type resolver, the registry of
/// component schemas and the diagnostics raised while building them. A component is
/// synthesized at most once; its registry slot is reserved before its fields are visited,
/// so a type reaching itself again gets a plain `$ref`.
pub struct SchemaGenerator {
    type_resolver: TypeResolver,
    nodes: Vec<SchemaNode>,
    index: HashMap<QualifiedName, SchemaId>,
    containers: HashMap<QualifiedName, ContainerAnnotations>,
    names: NameAllocator,
    /// Components currently being synthesized
    visiting: HashSet<QualifiedName>,
    /// Opted-in declarations that cannot become schemas
    failed: HashSet<QualifiedName>,
    /// Aliases being expanded inline
    expanding: HashSet<QualifiedName>,
    diagnostics: Diagnostics,
}

impl SchemaGenerator {
    pub fn new(type_resolver: TypeResolver) -> Self {
        debug!("Initializing SchemaGenerator");
        let mut generator = Self {
            type_resolver,
            nodes: Vec::new(),
            index: HashMap::new(),
            containers: HashMap::new(),
            names: NameAllocator::default(),
            visiting: HashSet::new(),
            failed: HashSet::new(),
            expanding: HashSet::new(),
            diagnostics: Diagnostics::new(),
        };
        generator.allocate_names();
        generator
    }

    /// Names every opted-in declaration: explicit overrides first, then canonical order.
    fn allocate_names(&mut self) {
        let candidates = self.schema_declarations();
        let (explicit, implicit): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|name| self.container_annotations(name).name.is_some());

        for name in explicit.iter().chain(implicit.iter()) {
            self.component_name(name);
        }
    }

    /// Qualified names of every declaration opted in as a schema, in canonical order.
    fn schema_declarations(&mut self) -> Vec<QualifiedName> {
        let names: Vec<QualifiedName> = self
            .type_resolver
            .table()
            .declarations()
            .map(|d| d.name.clone())
            .collect();
        names.into_iter().filter(|name| self.is_schema(name)).collect()
    }

    /// Container-level annotations of a declaration, lexed once per run.
    pub fn container_annotations(&mut self, name: &QualifiedName) -> &ContainerAnnotations {
        if !self.containers.contains_key(name) {
            let docs = self
                .type_resolver
                .declaration(name)
                .map(|d| d.docs.clone())
                .unwrap_or_default();
            let subject = name.to_string();
            let block = lex(&docs, &subject, &mut self.diagnostics);
            let record = ContainerAnnotations::from_block(&block, &subject, &mut self.diagnostics);
            self.containers.insert(name.clone(), record);
        }
        &self.containers[name]
    }

    /// Whether the declaration carries the `openapi:schema` directive.
    pub fn is_schema(&mut self, name: &QualifiedName) -> bool {
        self.type_resolver.declaration(name).is_some() && self.container_annotations(name).schema
    }

    fn component_name(&mut self, name: &QualifiedName) -> String {
        if let Some(assigned) = self.names.get(name) {
            return assigned.clone();
        }
        let preferred = self
            .container_annotations(name)
            .name
            .clone()
            .unwrap_or_else(|| name.name.clone());
        self.names.assign(name, &preferred, &mut self.diagnostics)
    }

    /// Synthesizes every opted-in declaration, including ones loaded while doing so.
    pub fn synthesize_all(&mut self) {
        loop {
            let pending: Vec<QualifiedName> = self
                .schema_declarations()
                .into_iter()
                .filter(|name| !self.index.contains_key(name) && !self.failed.contains(name))
                .collect();
            if pending.is_empty() {
                break;
            }
            for name in pending {
                self.synthesize(&name);
            }
        }
        debug!("Synthesized {} component schemas", self.nodes.len());
    }

    /// Returns the component for `name`, building it on first request.
    ///
    /// `None` when the declaration is unknown, not opted in, or cannot be a schema.
    pub fn synthesize(&mut self, name: &QualifiedName) -> Option<SchemaId> {
        if let Some(&id) = self.index.get(name) {
            if self.visiting.contains(name) {
                debug!("Cycle through {}: emitting reference", name);
            }
            return Some(id);
        }
        if self.failed.contains(name) || !self.is_schema(name) {
            return None;
        }
        let declaration = self.type_resolver.declaration(name)?.clone();

        if let DeclarationKind::Interface { .. } = declaration.kind {
            self.diagnostics
                .error(name.to_string(), "traits cannot be schemas; schema directive ignored");
            self.failed.insert(name.clone());
            return None;
        }

        debug!("Synthesizing schema for {}", name);
        let component = self.component_name(name);
        let id = self.nodes.len();
        self.nodes.push(SchemaNode {
            canonical_name: name.clone(),
            name: component,
            schema: Schema::default(),
        });
        self.index.insert(name.clone(), id);
        self.visiting.insert(name.clone());

        let mut schema = match &declaration.kind {
            DeclarationKind::Struct { fields } => self.synthesize_struct(&declaration, fields),
            DeclarationKind::Enum { variants } => self.synthesize_enum(&declaration, variants),
            DeclarationKind::Alias { target } => {
                let subject = name.to_string();
                let ty = TypeExpr::classify(target, &declaration.generics);
                self.resolve(&ty, &declaration.name.module, &subject)
                    .unwrap_or_default()
            }
            DeclarationKind::Interface { .. } => Schema::default(),
        };

        let container = self.container_annotations(name).clone();
        if let Some(description) = container.description {
            schema.description = Some(description);
        }
        if let Some(xml) = container.xml_name {
            schema.xml = Some(Xml { name: xml });
        }
        if container.external_docs.is_some() {
            schema.external_docs = container.external_docs;
        }
        if container.deprecated.is_some() {
            schema.deprecated = container.deprecated;
        }

        self.visiting.remove(name);
        self.nodes[id].schema = schema;
        Some(id)
    }

    fn synthesize_struct(&mut self, declaration: &Declaration, fields: &[FieldDecl]) -> Schema {
        let mut schema = Schema::of(SchemaKind::Object);

        for (position, field) in fields.iter().enumerate() {
            let Some(ident) = &field.ident else {
                self.diagnostics.error(
                    format!("{}.{}", declaration.name, position),
                    "tuple field has no serialized name; field omitted",
                );
                continue;
            };
            let subject = format!("{}.{}", declaration.name, ident);
            if field.serde.skip {
                debug!("Skipping {}: not serialized", subject);
                continue;
            }

            let block = lex(&field.docs, &subject, &mut self.diagnostics);
            let annotations = FieldAnnotations::from_block(&block, &subject, &mut self.diagnostics);
            if field.serde.flatten {
                self.diagnostics
                    .error(&subject, "flattened fields are not expanded; field omitted");
                continue;
            }

            let exposed = annotations
                .name
                .clone()
                .or_else(|| field.serde.rename.clone())
                .or_else(|| declaration.serde.rename_all.map(|rule| rule.apply_to_field(ident)))
                .unwrap_or_else(|| ident.clone());

            let ty = TypeExpr::classify(&field.ty, &declaration.generics);
            let Some(property) =
                self.field_schema(&ty, &annotations, &declaration.name.module, &subject)
            else {
                continue;
            };

            let required = !is_optional(&field.ty)
                && !field.serde.default
                && !field.serde.skip_serializing_if
                && !declaration.serde.default;
            if required {
                schema.required.push(exposed.clone());
            }
            if schema.properties.insert(exposed.clone(), property).is_some() {
                self.diagnostics
                    .warn(&subject, format!("property `{}` declared twice; last one kept", exposed));
            }
        }

        schema
    }

    fn synthesize_enum(&mut self, declaration: &Declaration, variants: &[VariantDecl]) -> Schema {
        let mut schema = Schema::of(SchemaKind::String);

        for variant in variants {
            if variant.serde.skip {
                continue;
            }
            if !variant.is_unit {
                self.diagnostics.error(
                    format!("{}::{}", declaration.name, variant.ident),
                    "variant carries data; omitted from enum values",
                );
                continue;
            }
            let value = variant
                .serde
                .rename
                .clone()
                .or_else(|| declaration.serde.rename_all.map(|rule| rule.apply_to_variant(&variant.ident)))
                .unwrap_or_else(|| variant.ident.clone());
            schema.enum_values.push(Value::String(value));
        }

        schema
    }

    /// Builds one property: a `oneOf` composition when members resolve, else the inferred
    /// type, with the field annotations laid over it.
    fn field_schema(
        &mut self,
        ty: &TypeExpr,
        annotations: &FieldAnnotations,
        scope: &ModulePath,
        subject: &str,
    ) -> Option<Schema> {
        let mut composition = None;
        if !annotations.one_of.is_empty() {
            let mut members = Vec::new();
            for member in &annotations.one_of {
                match self.reference_for(member, scope, subject) {
                    Ok(schema) => members.push(schema),
                    Err(reason) => self
                        .diagnostics
                        .warn(subject, format!("oneOf member `{}` dropped: {}", member, reason)),
                }
            }
            if members.is_empty() {
                self.diagnostics
                    .warn(subject, "no oneOf member left; keeping the inferred type");
            } else {
                composition = Some(Schema {
                    one_of: members,
                    ..Schema::default()
                });
            }
        }

        let composed = composition.is_some();
        let mut schema = match composition {
            Some(schema) => schema,
            None => self.resolve(ty, scope, subject)?,
        };
        overlay(&mut schema, annotations, composed);
        Some(schema)
    }

    /// Lenient resolution used for fields: non-opted types resolve by kind only.
    ///
    /// `None` means the type could not be resolved; an error has been recorded.
    fn resolve(&mut self, ty: &TypeExpr, scope: &ModulePath, subject: &str) -> Option<Schema> {
        match ty {
            TypeExpr::Primitive(primitive) => Some(Schema::primitive(*primitive)),
            TypeExpr::Pointer(inner) => self.resolve(inner, scope, subject),
            TypeExpr::Array(inner) => Some(Schema::array(self.resolve(inner, scope, subject)?)),
            TypeExpr::Map { key, value } => {
                if !key.is_string_like() {
                    self.diagnostics
                        .warn(subject, "map key is not string-like; treated as string");
                }
                Some(Schema::map(self.resolve(value, scope, subject)?))
            }
            TypeExpr::Any => Some(Schema::default()),
            TypeExpr::Unsupported(what) => {
                self.diagnostics
                    .error(subject, format!("unsupported type ({}); omitted", what));
                None
            }
            TypeExpr::Named(_) | TypeExpr::Selector { .. } => {
                if let Some(known) = self.undeclared_well_known(ty, scope) {
                    return self.resolve(&known, scope, subject);
                }
                let segments = ty.segments().unwrap_or_default();
                let Some(name) = self.lookup(&segments, scope) else {
                    self.diagnostics.error(
                        subject,
                        format!("type `{}` not found; omitted", segments.join("::")),
                    );
                    return None;
                };
                match self.synthesize(&name) {
                    Some(id) => Some(Schema::reference(&self.nodes[id].name)),
                    None => Some(self.kind_only(&name, subject)),
                }
            }
        }
    }

    /// Inline shape of a declaration that is not a component.
    fn kind_only(&mut self, name: &QualifiedName, subject: &str) -> Schema {
        let Some(declaration) = self.type_resolver.declaration(name).cloned() else {
            return Schema::default();
        };
        match &declaration.kind {
            DeclarationKind::Struct { .. } => Schema::of(SchemaKind::Object),
            DeclarationKind::Enum { .. } => Schema::of(SchemaKind::String),
            DeclarationKind::Interface { .. } => Schema::default(),
            DeclarationKind::Alias { target } => {
                if !self.expanding.insert(name.clone()) {
                    debug!("Alias cycle through {}", name);
                    return Schema::default();
                }
                let ty = TypeExpr::classify(target, &declaration.generics);
                let schema = self.resolve(&ty, &name.module, subject).unwrap_or_default();
                self.expanding.remove(name);
                schema
            }
        }
    }

    /// Resolves a type written in an annotation (`body`, `response`, `oneOf`).
    ///
    /// Named types must be opted-in schemas and become `$ref`s.
    pub fn reference_for(&mut self, source: &str, scope: &ModulePath, subject: &str) -> Result<Schema, String> {
        let ty = TypeExpr::parse(source)?;
        self.strict(&ty, scope, subject)
    }

    fn strict(&mut self, ty: &TypeExpr, scope: &ModulePath, subject: &str) -> Result<Schema, String> {
        match ty {
            TypeExpr::Primitive(primitive) => Ok(Schema::primitive(*primitive)),
            TypeExpr::Pointer(inner) => self.strict(inner, scope, subject),
            TypeExpr::Array(inner) => Ok(Schema::array(self.strict(inner, scope, subject)?)),
            TypeExpr::Map { value, .. } => Ok(Schema::map(self.strict(value, scope, subject)?)),
            TypeExpr::Any => Ok(Schema::default()),
            TypeExpr::Unsupported(what) => Err(format!("unsupported type ({})", what)),
            TypeExpr::Named(_) | TypeExpr::Selector { .. } => {
                if let Some(known) = self.undeclared_well_known(ty, scope) {
                    return self.strict(&known, scope, subject);
                }
                let segments = ty.segments().unwrap_or_default();
                let written = segments.join("::");
                let name = self
                    .lookup(&segments, scope)
                    .ok_or_else(|| format!("type `{}` not found", written))?;
                if !self.is_schema(&name) {
                    return Err(format!("`{}` is not declared as a schema", written));
                }
                let id = self
                    .synthesize(&name)
                    .ok_or_else(|| format!("`{}` cannot be built as a schema", written))?;
                Ok(Schema::reference(&self.nodes[id].name))
            }
        }
    }

    /// Built-in reading of a bare library name (`Value`, `Uuid`...) that nothing in scope declares.
    fn undeclared_well_known(&mut self, ty: &TypeExpr, scope: &ModulePath) -> Option<TypeExpr> {
        let TypeExpr::Named(name) = ty else {
            return None;
        };
        let known = TypeExpr::well_known(name)?;
        let declared = self
            .type_resolver
            .lookup(std::slice::from_ref(name), scope, &mut self.diagnostics);
        declared.is_none().then_some(known)
    }

    /// Scope lookup, then exposed component names, then a unique local name.
    fn lookup(&mut self, segments: &[String], scope: &ModulePath) -> Option<QualifiedName> {
        if let Some(found) = self.type_resolver.lookup(segments, scope, &mut self.diagnostics) {
            return Some(found);
        }
        let [single] = segments else {
            return None;
        };
        if let Some(found) = self.names.lookup(single) {
            return Some(found.clone());
        }
        self.type_resolver.find_unique(single)
    }

    pub fn type_resolver(&self) -> &TypeResolver {
        &self.type_resolver
    }

    pub fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id]
    }

    /// Component registered for a canonical name, if synthesized.
    pub fn node_for(&self, name: &QualifiedName) -> Option<&SchemaNode> {
        self.index.get(name).map(|&id| &self.nodes[id])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Component schemas keyed by component name, sorted.
    pub fn components(&self) -> BTreeMap<String, Schema> {
        self.nodes
            .iter()
            .map(|node| (node.name.clone(), node.schema.clone()))
            .collect()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }
}

/// Lays field annotations over a resolved schema; annotations win over inferred values.
///
/// A composition only keeps description, nullable and deprecated.
fn overlay(schema: &mut Schema, annotations: &FieldAnnotations, composed: bool) {
    if let Some(description) = &annotations.description {
        schema.description = Some(description.clone());
    }
    if annotations.nullable.is_some() {
        schema.nullable = annotations.nullable;
    }
    if annotations.deprecated.is_some() {
        schema.deprecated = annotations.deprecated;
    }
    if composed {
        return;
    }

    if let Some(format) = &annotations.format {
        schema.format = Some(format.clone());
    }
    let kind = schema.kind;
    if let Some(example) = &annotations.example {
        schema.example = Some(coerce(example, kind));
    }
    if let Some(default) = &annotations.default {
        schema.default = Some(coerce(default, kind));
    }
    if !annotations.enum_values.is_empty() {
        schema.enum_values = annotations
            .enum_values
            .iter()
            .map(|value| coerce(value, kind))
            .collect();
    }
}

/// Converts an annotation literal to the JSON value matching `kind`, falling back to a string.
fn coerce(literal: &str, kind: Option<SchemaKind>) -> Value {
    let parsed = match kind {
        Some(SchemaKind::Integer) => literal.parse::<i64>().ok().map(Value::from),
        Some(SchemaKind::Number) => literal
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        Some(SchemaKind::Boolean) => literal.parse::<bool>().ok().map(Value::Bool),
        Some(SchemaKind::Array) | Some(SchemaKind::Object) => serde_json::from_str(literal).ok(),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(literal.to_string()))
}

/// `Option<_>` under any path prefix.
fn is_optional(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident == "Option")
            .unwrap_or(false),
        syn::Type::Paren(paren) => is_optional(&paren.elem),
        syn::Type::Group(group) => is_optional(&group.elem),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::DeclarationTable;
    use crate::parser::{AstParser, ParsedFile};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    fn create_generator(files: Vec<ParsedFile>) -> SchemaGenerator {
        let mut diagnostics = Diagnostics::new();
        let table = DeclarationTable::extract(&files, &mut diagnostics).unwrap();
        SchemaGenerator::new(TypeResolver::new(table))
    }

    /// Helper function to create a SchemaGenerator from code in the crate root
    fn create_generator_from_code(code: &str) -> SchemaGenerator {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "lib.rs", code);
        let parsed = AstParser::parse_file(&file_path).unwrap();
        create_generator(vec![parsed])
    }

    fn root(name: &str) -> QualifiedName {
        QualifiedName::new(ModulePath::root(), name)
    }

    fn component(generator: &mut SchemaGenerator, name: &str) -> Schema {
        let id = generator
            .synthesize(&root(name))
            .unwrap_or_else(|| panic!("{} should be a component", name));
        generator.node(id).schema.clone()
    }

    #[test]
    fn test_primitive_fields() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Sample {
                pub name: String,
                pub small: i32,
                pub big: u64,
                pub ratio: f32,
                pub precise: f64,
                pub flag: bool,
                pub blob: Vec<u8>,
                pub created: chrono::DateTime<chrono::Utc>,
                pub id: uuid::Uuid,
            }
            "#,
        );

        let schema = component(&mut generator, "Sample");
        let value = serde_json::to_value(&schema.properties).unwrap();
        assert_eq!(
            value,
            json!({
                "name": {"type": "string"},
                "small": {"type": "integer", "format": "int32"},
                "big": {"type": "integer", "format": "int64"},
                "ratio": {"type": "number", "format": "float"},
                "precise": {"type": "number", "format": "double"},
                "flag": {"type": "boolean"},
                "blob": {"type": "string", "format": "byte"},
                "created": {"type": "string", "format": "date-time"},
                "id": {"type": "string", "format": "uuid"},
            })
        );
    }

    #[test]
    fn test_nested_struct_is_referenced_not_inlined() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Category { pub id: i64, pub name: String }

            /// openapi:schema
            pub struct Pet { pub name: String, pub category: Category }
            "#,
        );
        generator.synthesize_all();

        let components = generator.components();
        assert_eq!(components.len(), 2);
        assert_eq!(
            components["Pet"].properties["category"],
            Schema::reference("Category")
        );
        assert_eq!(components["Category"].properties.len(), 2);
    }

    #[test]
    fn test_unflagged_struct_is_not_a_component() {
        let mut generator = create_generator_from_code(
            r#"
            /// Internal bookkeeping.
            pub struct Audit { pub by: String }

            /// Visible only through its kind.
            pub enum Mood { Happy, Sad }

            /// openapi:schema
            pub struct Pet { pub audit: Audit, pub mood: Option<Mood> }
            "#,
        );
        generator.synthesize_all();

        let components = generator.components();
        assert_eq!(components.keys().collect::<Vec<_>>(), vec!["Pet"]);
        assert_eq!(components["Pet"].properties["audit"], Schema::of(SchemaKind::Object));
        assert_eq!(components["Pet"].properties["mood"], Schema::of(SchemaKind::String));
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Category {
                pub name: String,
                pub parent: Option<Box<Category>>,
                pub children: Vec<Category>,
            }
            "#,
        );

        let schema = component(&mut generator, "Category");
        assert_eq!(schema.properties["parent"], Schema::reference("Category"));
        assert_eq!(
            schema.properties["children"],
            Schema::array(Schema::reference("Category"))
        );
        assert_eq!(schema.required, vec!["name", "children"]);
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Owner { pub pets: Vec<Pet> }

            /// openapi:schema
            pub struct Pet { pub owner: Owner }
            "#,
        );
        generator.synthesize_all();

        let components = generator.components();
        assert_eq!(components["Pet"].properties["owner"], Schema::reference("Owner"));
        assert_eq!(
            components["Owner"].properties["pets"],
            Schema::array(Schema::reference("Pet"))
        );
    }

    #[test]
    fn test_synthesis_is_interned() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Tag { pub name: String }

            /// openapi:schema
            pub struct Pet { pub tags: Vec<Tag>, pub primary: Tag }
            "#,
        );

        let first = generator.synthesize(&root("Tag")).unwrap();
        generator.synthesize_all();
        let second = generator.synthesize(&root("Tag")).unwrap();

        assert_eq!(first, second);
        assert_eq!(generator.len(), 2);
    }

    #[test]
    fn test_annotations_override_inferred_values() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Pet {
                /// openapi:format int64
                /// openapi:example 42
                pub id: i32,
                /// Pet status in the store.
                /// openapi:enum available, pending, sold
                /// openapi:default available
                pub status: String,
                /// openapi:nullable
                /// openapi:deprecated
                /// openapi:example true
                pub vaccinated: Option<bool>,
            }
            "#,
        );

        let schema = component(&mut generator, "Pet");
        let id = &schema.properties["id"];
        assert_eq!(id.format.as_deref(), Some("int64"));
        assert_eq!(id.example, Some(json!(42)));

        let status = &schema.properties["status"];
        assert_eq!(status.description.as_deref(), Some("Pet status in the store."));
        assert_eq!(status.enum_values, vec![json!("available"), json!("pending"), json!("sold")]);
        assert_eq!(status.default, Some(json!("available")));

        let vaccinated = &schema.properties["vaccinated"];
        assert_eq!(vaccinated.nullable, Some(true));
        assert_eq!(vaccinated.deprecated, Some(true));
        assert_eq!(vaccinated.example, Some(json!(true)));
    }

    #[test]
    fn test_required_set_follows_serde_options() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Pet {
                pub name: String,
                pub nickname: Option<String>,
                #[serde(default)]
                pub tags: Vec<String>,
                #[serde(skip_serializing_if = "Vec::is_empty")]
                pub photos: Vec<String>,
                /// openapi:nullable false
                pub age: u8,
            }

            /// openapi:schema
            #[serde(default)]
            pub struct Settings { pub theme: String }
            "#,
        );

        let pet = component(&mut generator, "Pet");
        assert_eq!(pet.required, vec!["name", "age"]);

        let settings = component(&mut generator, "Settings");
        assert!(settings.required.is_empty());
    }

    #[test]
    fn test_exposed_field_names() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            #[serde(rename_all = "camelCase")]
            pub struct Pet {
                pub photo_urls: Vec<String>,
                #[serde(rename = "pet_name")]
                pub name: String,
                /// openapi:name ID
                pub id: u64,
                #[serde(skip)]
                pub cache: String,
            }
            "#,
        );

        let schema = component(&mut generator, "Pet");
        let names: Vec<&String> = schema.properties.keys().collect();
        assert_eq!(names, vec!["photoUrls", "pet_name", "ID"]);
    }

    #[test]
    fn test_one_of_replaces_inferred_type() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Cat { pub purrs: bool }

            /// openapi:schema
            pub struct Dog { pub barks: bool }

            /// openapi:schema
            pub struct Pet {
                /// The animal itself.
                /// openapi:oneOf Cat Dog
                pub animal: serde_json::Value,
            }
            "#,
        );

        let schema = component(&mut generator, "Pet");
        let animal = &schema.properties["animal"];
        assert_eq!(animal.kind, None);
        assert_eq!(animal.one_of, vec![Schema::reference("Cat"), Schema::reference("Dog")]);
        assert_eq!(animal.description.as_deref(), Some("The animal itself."));
    }

    #[test]
    fn test_one_of_drops_unflagged_member() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Cat { pub purrs: bool }

            /// Not a schema.
            pub struct Ghost { pub boo: bool }

            /// openapi:schema
            pub struct Pet {
                /// openapi:oneOf Cat Ghost
                pub animal: serde_json::Value,
            }
            "#,
        );

        let schema = component(&mut generator, "Pet");
        assert_eq!(schema.properties["animal"].one_of, vec![Schema::reference("Cat")]);
        assert!(generator.diagnostics().warnings().any(|d| d.message.contains("`Ghost` dropped")));
    }

    #[test]
    fn test_one_of_without_members_keeps_inferred_type() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Pet {
                /// openapi:oneOf Ghost
                pub animal: String,
            }
            "#,
        );

        let schema = component(&mut generator, "Pet");
        assert_eq!(schema.properties["animal"], Schema::of(SchemaKind::String));
    }

    #[test]
    fn test_enum_alias_and_map() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            #[serde(rename_all = "lowercase")]
            pub enum Status { Available, #[serde(rename = "on-hold")] OnHold, Sold }

            /// openapi:schema PetIdentifier
            pub struct PetId(pub u64);

            /// openapi:schema
            /// openapi:xml inventory
            pub struct Inventory {
                pub counts: std::collections::HashMap<String, i32>,
                pub by_status: BTreeMap<Status, PetId>,
            }
            "#,
        );
        generator.synthesize_all();

        let components = generator.components();
        assert_eq!(
            components["Status"].enum_values,
            vec![json!("available"), json!("on-hold"), json!("sold")]
        );
        assert_eq!(components["PetIdentifier"], Schema::primitive(PrimitiveType::U64));

        let inventory = &components["Inventory"];
        assert_eq!(inventory.xml, Some(Xml { name: "inventory".to_string() }));
        assert_eq!(
            inventory.properties["counts"],
            Schema::map(Schema::primitive(PrimitiveType::I32))
        );
        assert_eq!(
            inventory.properties["by_status"],
            Schema::map(Schema::reference("PetIdentifier"))
        );
    }

    #[test]
    fn test_unresolvable_field_is_omitted() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Pet {
                pub name: String,
                pub secret: Mystery,
                pub pair: (i32, i32),
            }
            "#,
        );

        let schema = component(&mut generator, "Pet");
        assert_eq!(schema.properties.keys().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(schema.required, vec!["name"]);
        assert_eq!(generator.diagnostics().errors().count(), 2);
    }

    #[test]
    fn test_colliding_names_are_qualified() {
        let a = AstParser::parse_str(
            std::path::Path::new("src/a.rs"),
            ModulePath::from_segments(["a"]),
            "/// openapi:schema\npub struct Error { pub code: i32 }",
        )
        .unwrap();
        let b = AstParser::parse_str(
            std::path::Path::new("src/models/b.rs"),
            ModulePath::from_segments(["models", "b"]),
            "/// openapi:schema\npub struct Error { pub message: String }",
        )
        .unwrap();
        let mut generator = create_generator(vec![a, b]);
        generator.synthesize_all();

        let names: Vec<String> = generator.components().into_keys().collect();
        assert_eq!(names, vec!["Error", "models.b.Error"]);
        assert!(generator.diagnostics().contains("already used"));
    }

    #[test]
    fn test_explicit_names_win_allocation() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Animal { pub name: String }

            /// openapi:schema Animal
            pub struct Creature { pub name: String }
            "#,
        );
        generator.synthesize_all();

        let animal = generator.node_for(&root("Animal")).unwrap();
        let creature = generator.node_for(&root("Creature")).unwrap();
        assert_eq!(creature.name, "Animal");
        assert_eq!(animal.name, "crate.Animal");
    }

    #[test]
    fn test_reference_for_requires_opted_in_schema() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Pet { pub name: String }

            /// Plain struct.
            pub struct Draft { pub name: String }
            "#,
        );
        let scope = ModulePath::root();

        assert_eq!(
            generator.reference_for("Vec<Pet>", &scope, "listPets"),
            Ok(Schema::array(Schema::reference("Pet")))
        );
        assert_eq!(
            generator.reference_for("String", &scope, "ping"),
            Ok(Schema::of(SchemaKind::String))
        );
        assert!(generator.reference_for("Draft", &scope, "addPet").is_err());
        assert!(generator.reference_for("Missing", &scope, "addPet").is_err());
        assert!(generator.reference_for("Vec<", &scope, "addPet").is_err());
    }

    #[test]
    fn test_local_types_shadow_library_names() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Value { pub amount: i64 }

            /// openapi:schema
            pub struct Setting {
                pub value: Value,
                pub raw: serde_json::Value,
                pub id: Uuid,
            }
            "#,
        );

        let setting = component(&mut generator, "Setting");
        assert_eq!(setting.properties["value"], Schema::reference("Value"));
        assert_eq!(setting.properties["raw"], Schema::default());
        assert_eq!(setting.properties["id"], Schema::primitive(PrimitiveType::Uuid));
        assert_eq!(
            generator.reference_for("Value", &ModulePath::root(), "getSetting"),
            Ok(Schema::reference("Value"))
        );
        assert!(!generator.diagnostics().contains("not found"));
    }

    #[test]
    fn test_trait_cannot_be_schema() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub trait Animal { fn name(&self) -> String; }
            "#,
        );
        generator.synthesize_all();

        assert!(generator.is_empty());
        assert!(generator.diagnostics().contains("traits cannot be schemas"));
    }

    #[test]
    fn test_flattened_and_tuple_fields_are_reported() {
        let mut generator = create_generator_from_code(
            r#"
            /// openapi:schema
            pub struct Pet {
                pub name: String,
                #[serde(flatten)]
                pub extra: std::collections::HashMap<String, String>,
            }

            /// openapi:schema
            pub struct Pair(pub String, pub String);
            "#,
        );
        generator.synthesize_all();

        let components = generator.components();
        assert_eq!(components["Pet"].properties.len(), 1);
        assert!(components["Pair"].properties.is_empty());
        assert!(generator.diagnostics().contains("flattened"));
        assert!(generator.diagnostics().contains("tuple field"));
    }
}
