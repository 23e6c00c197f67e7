use crate::annotation::{DocumentAnnotations, ExternalDocs};
use crate::diagnostics::Diagnostics;
use crate::operation::{HttpMethod, OperationRecord, ParameterLocation};
use crate::schema_generator::{Schema, SchemaGenerator};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// OpenAPI version written when the metadata does not choose one
pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.3";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    openapi: String,
    /// OpenAPI info section
    info: Info,
    servers: Vec<Server>,
    tags: Vec<Tag>,
    /// Paths collection (URL path -> PathItem)
    paths: BTreeMap<String, PathItem>,
    /// operationId -> key of the operation that owns it
    operation_ids: HashMap<String, (String, HttpMethod)>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "termsOfService", skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    /// API version
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "externalDocs", skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Trace => &mut self.trace,
        }
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }

    /// Stores the operation, returning the one it replaced.
    pub fn set(&mut self, method: HttpMethod, operation: Operation) -> Option<Operation> {
        self.slot(method).replace(operation)
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Parameters (path, query, header, cookie)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    pub responses: BTreeMap<String, Response>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<IndexMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Always a primitive schema
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions, sorted by component name
    pub schemas: BTreeMap<String, Schema>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiDocument {
    /// The operation stored under `(path, method)`.
    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.get(path)?.operation(method)
    }

    /// Number of operations across all paths.
    pub fn operation_count(&self) -> usize {
        const METHODS: [HttpMethod; 8] = [
            HttpMethod::Get,
            HttpMethod::Put,
            HttpMethod::Post,
            HttpMethod::Delete,
            HttpMethod::Options,
            HttpMethod::Head,
            HttpMethod::Patch,
            HttpMethod::Trace,
        ];
        self.paths
            .values()
            .map(|item| METHODS.iter().filter(|m| item.operation(**m).is_some()).count())
            .sum()
    }
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            openapi: DEFAULT_OPENAPI_VERSION.to_string(),
            info: Info {
                title: "Generated API".to_string(),
                description: None,
                terms_of_service: None,
                contact: None,
                license: None,
                version: "1.0.0".to_string(),
            },
            servers: Vec::new(),
            tags: Vec::new(),
            paths: BTreeMap::new(),
            operation_ids: HashMap::new(),
        }
    }

    /// Applies document-level annotations; unset values keep their defaults.
    pub fn with_metadata(mut self, metadata: &DocumentAnnotations) -> Self {
        if let Some(version) = &metadata.openapi_version {
            self.openapi = version.clone();
        }
        if let Some(title) = &metadata.title {
            self.info.title = title.clone();
        }
        if let Some(version) = &metadata.version {
            self.info.version = version.clone();
        }
        if metadata.description.is_some() {
            self.info.description = metadata.description.clone();
        }
        if metadata.terms_of_service.is_some() {
            self.info.terms_of_service = metadata.terms_of_service.clone();
        }

        let contact = Contact {
            name: metadata.contact_name.clone(),
            url: metadata.contact_url.clone(),
            email: metadata.contact_email.clone(),
        };
        if contact != Contact::default() {
            self.info.contact = Some(contact);
        }
        if let Some(name) = &metadata.license_name {
            self.info.license = Some(License {
                name: name.clone(),
                url: metadata.license_url.clone(),
            });
        }

        self.servers.extend(metadata.servers.iter().map(|server| Server {
            url: server.url.clone(),
            description: server.description.clone(),
        }));
        for tag in &metadata.tags {
            self.add_tag(Tag {
                name: tag.name.clone(),
                description: tag.description.clone(),
                external_docs: None,
            });
        }
        self
    }

    /// Adds a document tag; a tag already present only gains missing details.
    pub fn add_tag(&mut self, tag: Tag) {
        match self.tags.iter_mut().find(|existing| existing.name == tag.name) {
            Some(existing) => {
                if existing.description.is_none() {
                    existing.description = tag.description;
                }
                if existing.external_docs.is_none() {
                    existing.external_docs = tag.external_docs;
                }
            }
            None => self.tags.push(tag),
        }
    }

    /// Add an operation; a second operation on the same `(path, method)` replaces the first.
    pub fn add_operation(&mut self, record: OperationRecord, diagnostics: &mut Diagnostics) {
        let OperationRecord {
            method,
            path,
            operation,
        } = record;
        debug!("Adding operation: {} {}", method, path);

        let operation_id = operation.operation_id.clone();
        let key = (path.clone(), method);

        let path_item = self.paths.entry(path.clone()).or_default();
        if let Some(previous) = path_item.set(method, operation) {
            diagnostics.warn(
                operation_id.clone(),
                format!(
                    "{} {} was already defined by {}; overwritten",
                    method, path, previous.operation_id
                ),
            );
            if self.operation_ids.get(&previous.operation_id) == Some(&key) {
                self.operation_ids.remove(&previous.operation_id);
            }
        }

        if let Some((other_path, other_method)) = self.operation_ids.get(&operation_id) {
            diagnostics.warn(
                operation_id.clone(),
                format!(
                    "operationId is also used by {} {}",
                    other_method, other_path
                ),
            );
        }
        self.operation_ids.insert(operation_id, key);
    }

    /// Build the final OpenAPI document
    pub fn build(self, schema_gen: &SchemaGenerator) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let schemas = schema_gen.components();
        let components = if schemas.is_empty() {
            None
        } else {
            Some(Components { schemas })
        };

        OpenApiDocument {
            openapi: self.openapi,
            info: self.info,
            servers: self.servers,
            tags: self.tags,
            paths: self.paths,
            components,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}
