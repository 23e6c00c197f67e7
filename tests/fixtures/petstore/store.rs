use crate::models::{ApiError, Inventory, Order};

pub struct StoreController;

/// Access to Petstore orders
/// openapi:name store
/// openapi:path /store
impl StoreController {
    /// Returns pet inventories by status
    /// openapi:operation GET /inventory getInventory
    /// openapi:response 200 Inventory
    /// openapi:security api_key
    pub fn inventory(&self) -> Inventory {
        Inventory::new()
    }

    /// Place an order for a pet
    /// openapi:operation POST /order placeOrder
    /// openapi:body Order
    /// openapi:response 200 Order
    /// openapi:response 400 ApiError
    pub fn place_order(&self, order: Order) -> Result<Order, ApiError> {
        Ok(order)
    }

    /// openapi:operation GET /order/{orderId}
    pub fn broken(&self) {}
}

/// Liveness probe
/// openapi:operation GET /health health
/// openapi:response 204
pub fn health() {}
