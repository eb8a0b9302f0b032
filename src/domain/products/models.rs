//! Product Models

use jiff::Timestamp;
use uuid::Uuid;

/// Product Model
///
/// Money fields are minor units (cents). `stock` is `None` for products
/// that do not track inventory; those are exempt from reservation.
#[derive(Debug, Clone)]
pub struct Product {
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub weight_grams: Option<u32>,
    pub category_uuid: Uuid,
    pub price: u64,
    pub discount_price: Option<u64>,
    pub discount_percent: f64,
    pub discount_active: bool,
    pub stock: Option<u64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Product {
    /// The price a buyer pays right now.
    #[must_use]
    pub fn effective_price(&self) -> u64 {
        if self.discount_active {
            self.discount_price.unwrap_or(self.price)
        } else {
            self.price
        }
    }

    /// Whether this product participates in stock reservation.
    #[must_use]
    pub fn tracks_stock(&self) -> bool {
        self.stock.is_some()
    }
}

/// New Product Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub weight_grams: Option<u32>,
    pub category_uuid: Uuid,
    pub price: u64,
    pub discount_price: Option<u64>,
    pub discount_active: bool,
    pub stock: Option<u64>,
}

/// Product Update Model
///
/// `None` fields keep their current value. Pricing fields are re-derived
/// from the merged old and new values on every update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub weight_grams: Option<u32>,
    pub category_uuid: Option<Uuid>,
    pub price: Option<u64>,
    pub discount_price: Option<u64>,
    pub discount_active: Option<bool>,
    pub stock: Option<u64>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
    pub current_page: u32,
}
