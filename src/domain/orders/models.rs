//! Order Models

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use uuid::Uuid;

use crate::domain::orders::errors::OrdersServiceError;

/// Lifecycle state of an order.
///
/// `Pending` is the durable audit trace written before reservation;
/// `Confirmed` is the commit point. `Shipped` and `Delivered` are
/// back-office transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
    Shipped,
    Delivered,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrdersServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            _ => Err(OrdersServiceError::UnknownStatus),
        }
    }
}

/// Order Model
#[derive(Debug, Clone)]
pub struct Order {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub total: u64,
    pub address: String,
    pub phone: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// OrderItem Model
///
/// `name` and `price_at_order` are frozen copies of the cart snapshot;
/// later catalog edits never change a placed order.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub uuid: Uuid,
    pub product_uuid: Uuid,
    pub name: String,
    pub quantity: u32,
    pub price_at_order: u64,
}

/// Persistence payload for a new order and its lines.
#[derive(Debug, Clone)]
pub(crate) struct NewOrder {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub total: u64,
    pub address: String,
    pub phone: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}
