//! Categories

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::CategoriesServiceError;
pub use service::*;
