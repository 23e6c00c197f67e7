//! Reading `#[serde(...)]` options, which decide exposed names, skipped fields and
//! required-ness.

use log::debug;
use syn::meta::ParseNestedMeta;

/// `#[serde(rename_all = "...")]` casing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    pub fn parse(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        })
    }

    /// Applies the rule to a `snake_case` field identifier.
    pub fn apply_to_field(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => pascal_from_snake(field),
            Self::Camel => {
                let pascal = pascal_from_snake(field);
                lower_first(&pascal)
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }

    /// Applies the rule to a `PascalCase` variant identifier.
    pub fn apply_to_variant(self, variant: &str) -> String {
        match self {
            Self::Pascal => variant.to_string(),
            Self::Lower => variant.to_ascii_lowercase(),
            Self::Upper => variant.to_ascii_uppercase(),
            Self::Camel => lower_first(variant),
            Self::Snake => snake_from_pascal(variant),
            Self::ScreamingSnake => snake_from_pascal(variant).to_ascii_uppercase(),
            Self::Kebab => snake_from_pascal(variant).replace('_', "-"),
            Self::ScreamingKebab => snake_from_pascal(variant)
                .replace('_', "-")
                .to_ascii_uppercase(),
        }
    }
}

fn pascal_from_snake(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn snake_from_pascal(variant: &str) -> String {
    let mut snake = String::new();
    for (i, ch) in variant.char_indices() {
        if ch.is_uppercase() && i > 0 {
            snake.push('_');
        }
        snake.push(ch.to_ascii_lowercase());
    }
    snake
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Serde options on a struct or enum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSerde {
    pub rename_all: Option<RenameRule>,
    /// `#[serde(default)]`: every field may be absent
    pub default: bool,
}

/// Serde options on a field or variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSerde {
    pub rename: Option<String>,
    pub skip: bool,
    pub skip_serializing_if: bool,
    pub default: bool,
    pub flatten: bool,
}

pub fn parse_container_serde(attrs: &[syn::Attribute]) -> ContainerSerde {
    let mut serde = ContainerSerde::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if let Some(rule) = serialize_name(&meta)? {
                    serde.rename_all = RenameRule::parse(&rule);
                    if serde.rename_all.is_none() {
                        debug!("Unknown rename_all rule: {}", rule);
                    }
                }
            } else if meta.path.is_ident("default") {
                serde.default = true;
                skip_value(&meta)?;
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            debug!("Ignoring malformed serde attribute: {}", e);
        }
    }

    serde
}

pub fn parse_field_serde(attrs: &[syn::Attribute]) -> FieldSerde {
    let mut serde = FieldSerde::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if let Some(name) = serialize_name(&meta)? {
                    serde.rename = Some(name);
                }
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde.skip = true;
            } else if meta.path.is_ident("skip_serializing_if") {
                serde.skip_serializing_if = true;
                skip_value(&meta)?;
            } else if meta.path.is_ident("default") {
                serde.default = true;
                skip_value(&meta)?;
            } else if meta.path.is_ident("flatten") {
                serde.flatten = true;
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            debug!("Ignoring malformed serde attribute: {}", e);
        }
    }

    serde
}

/// Reads `key = "x"` or the `serialize` half of `key(serialize = "x", deserialize = "y")`.
fn serialize_name(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        let name: syn::LitStr = meta.value()?.parse()?;
        return Ok(Some(name.value()));
    }

    let mut serialize = None;
    if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| {
            if inner.path.is_ident("serialize") {
                let name: syn::LitStr = inner.value()?.parse()?;
                serialize = Some(name.value());
            } else {
                skip_value(&inner)?;
            }
            Ok(())
        })?;
    }
    Ok(serialize)
}

/// Consumes whatever follows an option we do not interpret.
fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_value(&inner))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(source: &str) -> syn::Field {
        let item: syn::ItemStruct = syn::parse_str(&format!("struct S {{ {} }}", source)).unwrap();
        item.fields.into_iter().next().unwrap()
    }

    #[test]
    fn test_field_options() {
        let renamed = parse_field_serde(&field(r#"#[serde(rename = "petName")] name: String"#).attrs);
        assert_eq!(renamed.rename.as_deref(), Some("petName"));

        let optional = parse_field_serde(
            &field(r#"#[serde(default, skip_serializing_if = "Option::is_none")] tag: Option<String>"#).attrs,
        );
        assert!(optional.default);
        assert!(optional.skip_serializing_if);
        assert!(!optional.skip);

        let skipped = parse_field_serde(&field("#[serde(skip)] cache: u32").attrs);
        assert!(skipped.skip);

        let flattened = parse_field_serde(&field("#[serde(flatten)] extra: Extra").attrs);
        assert!(flattened.flatten);
    }

    #[test]
    fn test_rename_with_serialize_and_unknown_options() {
        let attrs = field(
            r#"#[serde(alias = "n", rename(serialize = "out", deserialize = "in"), with = "module")] name: String"#,
        )
        .attrs;
        let serde = parse_field_serde(&attrs);
        assert_eq!(serde.rename.as_deref(), Some("out"));
    }

    #[test]
    fn test_container_options() {
        let item: syn::ItemStruct = syn::parse_str(
            r#"#[derive(Serialize)] #[serde(rename_all = "camelCase", default, deny_unknown_fields)] struct S { a: u8 }"#,
        )
        .unwrap();
        let serde = parse_container_serde(&item.attrs);
        assert_eq!(serde.rename_all, Some(RenameRule::Camel));
        assert!(serde.default);
    }

    #[test]
    fn test_rename_rules() {
        assert_eq!(RenameRule::Camel.apply_to_field("created_at"), "createdAt");
        assert_eq!(RenameRule::Pascal.apply_to_field("created_at"), "CreatedAt");
        assert_eq!(RenameRule::Kebab.apply_to_field("created_at"), "created-at");
        assert_eq!(RenameRule::ScreamingSnake.apply_to_field("created_at"), "CREATED_AT");

        assert_eq!(RenameRule::Snake.apply_to_variant("InStock"), "in_stock");
        assert_eq!(RenameRule::Lower.apply_to_variant("InStock"), "instock");
        assert_eq!(RenameRule::Camel.apply_to_variant("InStock"), "inStock");
        assert_eq!(RenameRule::ScreamingKebab.apply_to_variant("InStock"), "IN-STOCK");
    }
}
