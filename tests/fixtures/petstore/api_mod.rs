//! HTTP handlers.

pub mod pets;
pub mod store;
