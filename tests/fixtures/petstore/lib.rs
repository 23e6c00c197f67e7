//! openapi:info title Swagger Petstore
//! openapi:info version 1.0.7
//! openapi:info description start
//! This is a sample server Petstore server.
//!
//! Pets, orders and the store inventory.
//! openapi:info description end
//! openapi:info license.name Apache 2.0
//! openapi:info license.url https://www.apache.org/licenses/LICENSE-2.0.html
//! openapi:info contact.email apiteam@swagger.io
//! openapi:server https://petstore.swagger.io/v2 --- Production
//! openapi:tag store --- Access to Petstore orders

pub mod api;
pub mod models;
