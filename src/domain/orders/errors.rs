//! Orders service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{carts::CartsServiceError, products::ProductsServiceError};

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("cart is empty")]
    EmptyCart,

    #[error("insufficient stock for product {product}")]
    InsufficientStock { product: Uuid },

    #[error("order not found")]
    NotFound,

    #[error("stored status is not recognized")]
    UnknownStatus,

    #[error("related resource not found")]
    InvalidReference,

    #[error("invalid data")]
    InvalidData,

    #[error("cart error")]
    Carts(#[from] CartsServiceError),

    #[error("product error")]
    Products(#[from] ProductsServiceError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for OrdersServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(_) | None => Self::Sql(error),
        }
    }
}
