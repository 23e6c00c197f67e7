use crate::annotation::{
    lex, ContainerAnnotations, OperationAnnotations, ParamAnnotation, ResponseAnnotation,
    SecurityRequirement,
};
use crate::declaration::{DeclarationKind, OperationCandidate, Owner};
use crate::diagnostics::Diagnostics;
use crate::module_path::{ModulePath, QualifiedName};
use crate::openapi_builder::{MediaType, Operation, Parameter, RequestBody, Response, Tag};
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::type_resolver::PrimitiveType;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Media type used when an operation declares no `consumes`/`produces`
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// HTTP methods an operation can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn parse(verb: &str) -> Option<Self> {
        Some(match verb.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "PUT" => HttpMethod::Put,
            "POST" => HttpMethod::Post,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            "HEAD" => HttpMethod::Head,
            "PATCH" => HttpMethod::Patch,
            "TRACE" => HttpMethod::Trace,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a parameter (path, query, header, cookie)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(location: &str) -> Option<Self> {
        Some(match location.to_ascii_lowercase().as_str() {
            "path" => ParameterLocation::Path,
            "query" => ParameterLocation::Query,
            "header" => ParameterLocation::Header,
            "cookie" => ParameterLocation::Cookie,
            _ => return None,
        })
    }
}

/// One operation bound to its `(path, method)` key.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub method: HttpMethod,
    /// Full path template including the owner's base path
    pub path: String,
    pub operation: Operation,
}

/// Builds operation records from annotated trait methods, impl methods and functions.
///
/// Owner (trait or impl) annotations supply base path, default tags, summary, security
/// and deprecation; the method's own directives override them. Owners carrying
/// `openapi:name` also become document tags.
#[derive(Debug, Default)]
pub struct OperationAssembler {
    owners: HashMap<(ModulePath, String, Vec<String>), ContainerAnnotations>,
    tags: Vec<Tag>,
    tag_names: HashSet<String>,
}

impl OperationAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles every candidate, dropping the malformed ones.
    pub fn assemble_all(
        &mut self,
        candidates: &[OperationCandidate],
        schemas: &mut SchemaGenerator,
        diagnostics: &mut Diagnostics,
    ) -> Vec<OperationRecord> {
        let records: Vec<OperationRecord> = candidates
            .iter()
            .filter_map(|candidate| self.assemble(candidate, schemas, diagnostics))
            .collect();
        debug!(
            "Assembled {} operations from {} candidates",
            records.len(),
            candidates.len()
        );
        records
    }

    /// Builds one record; `None` (with an error diagnostic) when verb, path or id is missing.
    pub fn assemble(
        &mut self,
        candidate: &OperationCandidate,
        schemas: &mut SchemaGenerator,
        diagnostics: &mut Diagnostics,
    ) -> Option<OperationRecord> {
        let subject = candidate.subject.as_str();
        let block = lex(&candidate.docs, subject, diagnostics);
        let annotations = OperationAnnotations::from_block(&block, subject, diagnostics);
        let owner = match &candidate.owner {
            Some(owner) => self.owner_annotations(owner, &candidate.module, schemas, diagnostics),
            None => ContainerAnnotations::default(),
        };

        let mut missing = Vec::new();
        if annotations.method.is_none() {
            missing.push("verb");
        }
        if annotations.path.is_none() {
            missing.push("path");
        }
        if annotations.operation_id.is_none() {
            missing.push("operation id");
        }
        let (Some(verb), Some(route), Some(operation_id)) = (
            annotations.method.as_deref(),
            annotations.path.as_deref(),
            annotations.operation_id.clone(),
        ) else {
            diagnostics.error(
                subject,
                format!("operation dropped: missing {}", missing.join(", ")),
            );
            return None;
        };
        let Some(method) = HttpMethod::parse(verb) else {
            diagnostics.error(subject, format!("operation dropped: unknown HTTP verb `{}`", verb));
            return None;
        };

        let path = join_path(owner.base_path.as_deref(), route);
        debug!("Assembling {} {} ({})", method, path, operation_id);

        let tags = if !annotations.tags.is_empty() {
            annotations.tags.clone()
        } else if !owner.tags.is_empty() {
            owner.tags.clone()
        } else {
            owner.name.iter().cloned().collect()
        };
        let security = if annotations.security.is_empty() {
            &owner.security
        } else {
            &annotations.security
        };

        let operation = Operation {
            tags,
            summary: annotations.summary.clone().or_else(|| owner.summary.clone()),
            description: annotations.description.clone(),
            operation_id,
            parameters: self.parameters(&annotations.params, &path, subject, diagnostics),
            request_body: self.request_body(&annotations, &candidate.module, subject, schemas, diagnostics),
            responses: self.responses(&annotations, &candidate.module, subject, schemas, diagnostics),
            security: security.iter().map(security_requirement).collect(),
            deprecated: annotations.deprecated.or(owner.deprecated),
        };

        Some(OperationRecord {
            method,
            path,
            operation,
        })
    }

    /// Tags contributed by named traits and impls, in discovery order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn owner_annotations(
        &mut self,
        owner: &Owner,
        module: &ModulePath,
        schemas: &mut SchemaGenerator,
        diagnostics: &mut Diagnostics,
    ) -> ContainerAnnotations {
        let key = (module.clone(), owner.name.clone(), owner.docs.clone());
        if let Some(cached) = self.owners.get(&key) {
            return cached.clone();
        }

        // Traits are declarations, so the schema generator has lexed them already
        let declared = QualifiedName::new(module.clone(), owner.name.clone());
        let is_trait = matches!(
            schemas.type_resolver().declaration(&declared).map(|d| &d.kind),
            Some(DeclarationKind::Interface { .. })
        );
        let annotations = if is_trait {
            schemas.container_annotations(&declared).clone()
        } else {
            let subject = format!("{}::{}", module, owner.name);
            let block = lex(&owner.docs, &subject, diagnostics);
            ContainerAnnotations::from_block(&block, &subject, diagnostics)
        };

        if let Some(name) = &annotations.name {
            if self.tag_names.insert(name.clone()) {
                self.tags.push(Tag {
                    name: name.clone(),
                    description: annotations.description.clone(),
                    external_docs: annotations.external_docs.clone(),
                });
            }
        }

        self.owners.insert(key, annotations.clone());
        annotations
    }

    fn parameters(
        &self,
        declared: &[ParamAnnotation],
        path: &str,
        subject: &str,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Parameter> {
        let mut parameters = Vec::new();

        for param in declared {
            let Some(location) = ParameterLocation::parse(&param.location) else {
                diagnostics.error(
                    subject,
                    format!(
                        "parameter `{}` dropped: unknown location `{}`",
                        param.name, param.location
                    ),
                );
                continue;
            };
            let Some(primitive) = PrimitiveType::from_param_type(&param.type_name) else {
                diagnostics.error(
                    subject,
                    format!(
                        "parameter `{}` dropped: `{}` is not a primitive type",
                        param.name, param.type_name
                    ),
                );
                continue;
            };

            let mut required = param.required;
            if location == ParameterLocation::Path && !required {
                diagnostics.warn(
                    subject,
                    format!("path parameter `{}` is always required", param.name),
                );
                required = true;
            }

            parameters.push(Parameter {
                name: param.name.clone(),
                location,
                required,
                schema: Schema::primitive(primitive),
                description: param.description.clone(),
            });
        }

        for name in template_parameters(path) {
            let declared = parameters
                .iter()
                .any(|p| p.location == ParameterLocation::Path && p.name == name);
            if !declared {
                debug!("{}: adding undeclared path parameter {}", subject, name);
                parameters.push(Parameter {
                    name,
                    location: ParameterLocation::Path,
                    required: true,
                    schema: Schema::primitive(PrimitiveType::String),
                    description: None,
                });
            }
        }

        parameters
    }

    fn request_body(
        &self,
        annotations: &OperationAnnotations,
        module: &ModulePath,
        subject: &str,
        schemas: &mut SchemaGenerator,
        diagnostics: &mut Diagnostics,
    ) -> Option<RequestBody> {
        let body = annotations.body.as_ref()?;
        match schemas.reference_for(&body.type_name, module, subject) {
            Ok(schema) => Some(RequestBody {
                description: body.description.clone(),
                required: true,
                content: media_content(&annotations.consumes, &schema),
            }),
            Err(reason) => {
                diagnostics.error(subject, format!("request body dropped: {}", reason));
                None
            }
        }
    }

    fn responses(
        &self,
        annotations: &OperationAnnotations,
        module: &ModulePath,
        subject: &str,
        schemas: &mut SchemaGenerator,
        diagnostics: &mut Diagnostics,
    ) -> BTreeMap<String, Response> {
        let mut responses = BTreeMap::new();

        for declared in &annotations.responses {
            let response = self.response(declared, &annotations.produces, module, subject, schemas, diagnostics);
            if responses.insert(declared.status.clone(), response).is_some() {
                diagnostics.warn(
                    subject,
                    format!("response {} declared twice; last one kept", declared.status),
                );
            }
        }

        if responses.is_empty() {
            responses.insert(
                "200".to_string(),
                Response {
                    description: reason_phrase("200").to_string(),
                    content: IndexMap::new(),
                },
            );
        }
        responses
    }

    fn response(
        &self,
        declared: &ResponseAnnotation,
        produces: &[String],
        module: &ModulePath,
        subject: &str,
        schemas: &mut SchemaGenerator,
        diagnostics: &mut Diagnostics,
    ) -> Response {
        let description = declared
            .description
            .clone()
            .unwrap_or_else(|| reason_phrase(&declared.status).to_string());

        let content = match &declared.type_name {
            Some(type_name) => match schemas.reference_for(type_name, module, subject) {
                Ok(schema) => media_content(produces, &schema),
                Err(reason) => {
                    diagnostics.error(
                        subject,
                        format!("response {} kept without content: {}", declared.status, reason),
                    );
                    IndexMap::new()
                }
            },
            None => IndexMap::new(),
        };

        Response {
            description,
            content,
        }
    }
}

fn media_content(media_types: &[String], schema: &Schema) -> IndexMap<String, MediaType> {
    let defaults = [DEFAULT_MEDIA_TYPE.to_string()];
    let media_types = if media_types.is_empty() {
        &defaults[..]
    } else {
        media_types
    };
    media_types
        .iter()
        .map(|media| {
            (
                media.clone(),
                MediaType {
                    schema: schema.clone(),
                },
            )
        })
        .collect()
}

fn security_requirement(requirement: &SecurityRequirement) -> IndexMap<String, Vec<String>> {
    let mut map = IndexMap::new();
    map.insert(requirement.scheme.clone(), requirement.scopes.clone());
    map
}

/// Prefixes `route` with the owner's base path.
pub fn join_path(base: Option<&str>, route: &str) -> String {
    let route = route.trim();
    let base = base.map(|b| b.trim().trim_end_matches('/')).unwrap_or("");
    if base.is_empty() {
        return if route.starts_with('/') {
            route.to_string()
        } else {
            format!("/{}", route)
        };
    }
    match route.trim_start_matches('/') {
        "" => base.to_string(),
        rest => format!("{}/{}", base, rest),
    }
}

/// Names of `{param}` segments in a path template, in order.
pub fn template_parameters(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = after[..end].trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
    names
}

/// Default response description for a status code.
pub fn reason_phrase(status: &str) -> &'static str {
    match status {
        "200" => "OK",
        "201" => "Created",
        "202" => "Accepted",
        "204" => "No Content",
        "301" => "Moved Permanently",
        "302" => "Found",
        "304" => "Not Modified",
        "400" => "Bad Request",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not Found",
        "405" => "Method Not Allowed",
        "409" => "Conflict",
        "422" => "Unprocessable Entity",
        "429" => "Too Many Requests",
        "500" => "Internal Server Error",
        "502" => "Bad Gateway",
        "503" => "Service Unavailable",
        "1XX" => "Informational",
        "2XX" => "Success",
        "3XX" => "Redirection",
        "4XX" => "Client Error",
        "5XX" => "Server Error",
        "default" => "Default response",
        _ => "Response",
    }
}
