//! Orders

pub mod errors;
pub mod hooks;
pub mod models;
mod repository;
pub mod saga;
pub mod service;

pub use errors::OrdersServiceError;
pub use hooks::{ClearCartHook, NotifyHook, OrderHookError, OrderPlacedHook};
pub use models::{Order, OrderItem, OrderStatus};
pub use saga::{Compensation, CompensationResult, Saga};
pub use service::*;
