use super::lexer::{comma_list, parse_flag, space_list, split_description, unquote, CommentBlock};
use crate::diagnostics::Diagnostics;
use serde::{Deserialize, Serialize};

/// Link to documentation hosted elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDocs {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `openapi:security <scheme> [scope ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    pub scheme: String,
    pub scopes: Vec<String>,
}

impl SecurityRequirement {
    fn parse(argument: &str) -> Option<Self> {
        let mut tokens = argument.split_whitespace();
        let scheme = tokens.next()?.to_string();
        Some(Self {
            scheme,
            scopes: tokens.map(str::to_string).collect(),
        })
    }
}

/// Metadata attached to a struct, enum, alias, trait or impl block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerAnnotations {
    /// Opted in as a component schema
    pub schema: bool,
    /// Exposed schema name, or tag name for traits and impls
    pub name: Option<String>,
    pub xml_name: Option<String>,
    pub description: Option<String>,
    pub external_docs: Option<ExternalDocs>,
    pub base_path: Option<String>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub security: Vec<SecurityRequirement>,
    pub deprecated: Option<bool>,
}

impl ContainerAnnotations {
    pub fn from_block(block: &CommentBlock, subject: &str, diagnostics: &mut Diagnostics) -> Self {
        let mut record = Self::default();

        for directive in &block.directives {
            let argument = directive.argument.as_str();
            match directive.key().as_str() {
                "schema" => {
                    record.schema = true;
                    if let Some(name) = argument.split_whitespace().next() {
                        record.name = Some(name.to_string());
                    }
                }
                "name" => set_text(&mut record.name, argument),
                "xml" => set_text(&mut record.xml_name, argument),
                "description" => set_text(&mut record.description, argument),
                "externaldocs" => record.external_docs = parse_external_docs(argument),
                "path" | "basepath" => set_text(&mut record.base_path, argument),
                "tags" => record.tags.extend(comma_list(argument)),
                "tag" => set_item(&mut record.tags, argument),
                "summary" => set_text(&mut record.summary, argument),
                "security" => record.security.extend(SecurityRequirement::parse(argument)),
                "deprecated" => record.deprecated = parse_flag(argument),
                _ => unknown_directive(diagnostics, subject, &directive.name),
            }
        }

        if record.description.is_none() {
            record.description = block.plain_text.clone();
        }
        record
    }
}

/// Metadata attached to one struct field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAnnotations {
    pub name: Option<String>,
    pub description: Option<String>,
    pub example: Option<String>,
    pub default: Option<String>,
    pub format: Option<String>,
    pub nullable: Option<bool>,
    pub deprecated: Option<bool>,
    pub enum_values: Vec<String>,
    pub one_of: Vec<String>,
}

impl FieldAnnotations {
    pub fn from_block(block: &CommentBlock, subject: &str, diagnostics: &mut Diagnostics) -> Self {
        let mut record = Self::default();

        for directive in &block.directives {
            let argument = directive.argument.as_str();
            match directive.key().as_str() {
                "name" => set_text(&mut record.name, unquote(argument)),
                "description" => set_text(&mut record.description, argument),
                "example" => set_text(&mut record.example, unquote(argument)),
                "default" => set_text(&mut record.default, unquote(argument)),
                "format" => set_text(&mut record.format, unquote(argument)),
                "nullable" => record.nullable = parse_flag(argument),
                "deprecated" => record.deprecated = parse_flag(argument),
                "enum" => record.enum_values.extend(comma_list(argument)),
                "oneof" => record.one_of.extend(space_list(argument)),
                _ => unknown_directive(diagnostics, subject, &directive.name),
            }
        }

        if record.description.is_none() {
            record.description = block.plain_text.clone();
        }
        record
    }
}

/// `openapi:body <Type> [--- description]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyAnnotation {
    pub type_name: String,
    pub description: Option<String>,
}

/// `openapi:response [<status>] [<Type>] [--- description]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAnnotation {
    pub status: String,
    pub type_name: Option<String>,
    pub description: Option<String>,
}

/// `openapi:param <name> <in> <type> <required> [--- description]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamAnnotation {
    pub name: String,
    pub location: String,
    pub type_name: String,
    pub required: bool,
    pub description: Option<String>,
}

/// Metadata attached to an operation candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationAnnotations {
    pub method: Option<String>,
    pub path: Option<String>,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub body: Option<BodyAnnotation>,
    pub responses: Vec<ResponseAnnotation>,
    pub params: Vec<ParamAnnotation>,
    pub security: Vec<SecurityRequirement>,
    pub deprecated: Option<bool>,
}

impl OperationAnnotations {
    pub fn from_block(block: &CommentBlock, subject: &str, diagnostics: &mut Diagnostics) -> Self {
        let mut record = Self::default();

        for directive in &block.directives {
            let argument = directive.argument.as_str();
            match directive.key().as_str() {
                "operation" => {
                    let parts: Vec<&str> = argument.split_whitespace().collect();
                    if let [method, path, id] = parts.as_slice() {
                        record.method = Some(method.to_string());
                        record.path = Some(path.to_string());
                        record.operation_id = Some(id.to_string());
                    } else {
                        diagnostics.error(
                            subject,
                            format!(
                                "malformed operation directive `{}`: expected `<VERB> <path> <operationId>`",
                                argument
                            ),
                        );
                    }
                }
                "method" => set_text(&mut record.method, argument),
                "route" | "path" => set_text(&mut record.path, argument),
                "id" | "operationid" => set_text(&mut record.operation_id, argument),
                "summary" => set_text(&mut record.summary, argument),
                "description" => set_text(&mut record.description, argument),
                "tags" => record.tags.extend(comma_list(argument)),
                "tag" => set_item(&mut record.tags, argument),
                "consumes" => record.consumes.extend(space_list(argument)),
                "produces" => record.produces.extend(space_list(argument)),
                "security" => record.security.extend(SecurityRequirement::parse(argument)),
                "deprecated" => record.deprecated = parse_flag(argument),
                "body" => {
                    let (type_name, description) = split_description(argument);
                    if type_name.is_empty() {
                        diagnostics.error(subject, "body directive without a type dropped");
                    } else {
                        record.body = Some(BodyAnnotation {
                            type_name: type_name.to_string(),
                            description: description.map(str::to_string),
                        });
                    }
                }
                "response" | "success" | "failure" => {
                    record.responses.push(parse_response(argument));
                }
                "param" | "parameter" => match parse_param(argument) {
                    Ok(param) => record.params.push(param),
                    Err(reason) => diagnostics.error(
                        subject,
                        format!("parameter `{}` dropped: {}", argument, reason),
                    ),
                },
                _ => unknown_directive(diagnostics, subject, &directive.name),
            }
        }

        if record.summary.is_none() {
            record.summary = block.plain_text.clone();
        }
        record
    }
}

/// `openapi:tag <name> [--- description]` at document level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAnnotation {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAnnotation {
    pub url: String,
    pub description: Option<String>,
}

/// Document-level metadata from the crate root's inner doc comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentAnnotations {
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub openapi_version: Option<String>,
    pub terms_of_service: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_url: Option<String>,
    pub license_name: Option<String>,
    pub license_url: Option<String>,
    pub servers: Vec<ServerAnnotation>,
    pub tags: Vec<TagAnnotation>,
}

impl DocumentAnnotations {
    /// Folds one metadata comment group into the record; several groups may be folded in turn.
    pub fn fold(&mut self, block: &CommentBlock, subject: &str, diagnostics: &mut Diagnostics) {
        for directive in &block.directives {
            let argument = directive.argument.as_str();
            match directive.key().as_str() {
                "info" => self.fold_info(argument, subject, diagnostics),
                "server" => {
                    let (url, description) = split_description(argument);
                    if !url.is_empty() {
                        self.servers.push(ServerAnnotation {
                            url: url.to_string(),
                            description: description.map(str::to_string),
                        });
                    }
                }
                "tag" => {
                    let (name, description) = split_description(argument);
                    if !name.is_empty() {
                        self.tags.push(TagAnnotation {
                            name: name.to_string(),
                            description: description.map(str::to_string),
                        });
                    }
                }
                _ => unknown_directive(diagnostics, subject, &directive.name),
            }
        }
    }

    fn fold_info(&mut self, argument: &str, subject: &str, diagnostics: &mut Diagnostics) {
        let (key, value) = match argument.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (argument, ""),
        };

        let slot = match key.to_ascii_lowercase().as_str() {
            "title" => &mut self.title,
            "version" => &mut self.version,
            "description" => &mut self.description,
            "oas" | "openapi" => &mut self.openapi_version,
            "termsofservice" => &mut self.terms_of_service,
            "contact.name" => &mut self.contact_name,
            "contact.email" => &mut self.contact_email,
            "contact.url" => &mut self.contact_url,
            "license.name" => &mut self.license_name,
            "license.url" => &mut self.license_url,
            "server" | "servers" => {
                self.servers = space_list(value)
                    .map(|url| ServerAnnotation {
                        url,
                        description: None,
                    })
                    .collect();
                return;
            }
            _ => {
                diagnostics.warn(subject, format!("unknown info key `{}` ignored", key));
                return;
            }
        };
        set_text(slot, value);
    }
}

fn set_text(slot: &mut Option<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        *slot = Some(value.to_string());
    }
}

fn set_item(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        list.push(value.to_string());
    }
}

fn unknown_directive(diagnostics: &mut Diagnostics, subject: &str, name: &str) {
    diagnostics.warn(subject, format!("unknown directive `{}` ignored", name));
}

fn parse_external_docs(argument: &str) -> Option<ExternalDocs> {
    let (value, description) = split_description(argument);
    let mut tokens = value.split_whitespace();
    let url = tokens.next()?.to_string();
    let rest: Vec<&str> = tokens.collect();
    let description = description
        .map(str::to_string)
        .or_else(|| (!rest.is_empty()).then(|| rest.join(" ")));
    Some(ExternalDocs { url, description })
}

/// Status codes are three digits, an `NXX` range, or `default`.
pub fn is_status_code(token: &str) -> bool {
    if token == "default" {
        return true;
    }
    let bytes = token.as_bytes();
    bytes.len() == 3
        && (b'1'..=b'5').contains(&bytes[0])
        && (bytes[1..].iter().all(u8::is_ascii_digit)
            || bytes[1..].eq_ignore_ascii_case(b"XX"))
}

fn parse_response(argument: &str) -> ResponseAnnotation {
    let (value, description) = split_description(argument);
    let (status, type_name) = match value.split_once(char::is_whitespace) {
        Some((first, rest)) if is_status_code(first) => (first.to_string(), Some(rest.trim())),
        None if is_status_code(value) => (value.to_string(), None),
        _ => ("200".to_string(), Some(value)),
    };

    ResponseAnnotation {
        status: status.to_ascii_uppercase().replace("DEFAULT", "default"),
        type_name: type_name
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        description: description.map(str::to_string),
    }
}

fn parse_param(argument: &str) -> Result<ParamAnnotation, String> {
    let (value, description) = split_description(argument);
    let parts: Vec<&str> = value.split_whitespace().collect();
    let [name, location, type_name, required] = parts.as_slice() else {
        return Err(format!(
            "expected `<name> <in> <type> <required>`, found {} parts",
            parts.len()
        ));
    };
    let required = match required.to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        other => return Err(format!("required flag must be true or false, found `{}`", other)),
    };

    Ok(ParamAnnotation {
        name: name.to_string(),
        location: location.to_ascii_lowercase(),
        type_name: type_name.to_string(),
        required,
        description: description.map(str::to_string),
    })
}
