//! Cart Models

use jiff::Timestamp;
use uuid::Uuid;

/// Cart Model
///
/// Exactly one cart per user; the user's UUID is the cart's identity.
#[derive(Debug, Clone)]
pub struct Cart {
    pub user_uuid: Uuid,
    pub items: Vec<CartItem>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Cart {
    /// Sum of `quantity × price_at_add` over all items, in minor units.
    #[must_use]
    pub fn subtotal(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity) * item.price_at_add)
            .sum()
    }
}

/// CartItem Model
///
/// `product_name` and `product_stock` are live snapshots resolved at read
/// time; `price_at_add` was captured when the item entered the cart.
#[derive(Debug, Clone)]
pub struct CartItem {
    pub uuid: Uuid,
    pub product_uuid: Uuid,
    pub product_name: String,
    pub product_stock: Option<u64>,
    pub quantity: u32,
    pub price_at_add: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
