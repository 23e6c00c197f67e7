//! Data types exchanged by the petstore API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A pet for sale in the pet store.
/// openapi:schema
/// openapi:xml Pet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    /// openapi:format int64
    pub id: i64,
    /// openapi:example "doggie"
    pub name: String,
    pub category: Option<Category>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    pub tags: Vec<Tag>,
    /// Pet status in the store.
    pub status: Status,
}

/// A category for a pet.
/// openapi:schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A tag for a pet.
/// openapi:schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// openapi:schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Available,
    Pending,
    Sold,
}

/// Fields accepted when a pet is created.
/// openapi:schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPet {
    pub name: String,
    pub status: Option<Status>,
}

/// An order for a pet from the store.
/// openapi:schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub pet_id: i64,
    /// openapi:format int32
    pub quantity: u32,
    /// openapi:format date-time
    pub ship_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
}

/// Pet counts keyed by status.
/// openapi:schema
pub type Inventory = HashMap<String, i32>;

/// openapi:schema Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

/// Internal bookkeeping, never exposed.
pub struct AuditEntry {
    pub actor: String,
}
