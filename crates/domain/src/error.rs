//! Domain error types.

use common::OrderId;
use order_store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An order rule was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A lookup, the sequence or the order store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No order with this ID exists.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Short machine-readable name, used as a metrics label and in API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Order(err) => err.kind(),
            DomainError::Store(StoreError::ConcurrencyConflict { .. }) => "concurrency_conflict",
            DomainError::Store(_) => "store_failure",
            DomainError::OrderNotFound(_) => "order_not_found",
            DomainError::Serialization(_) => "serialization",
        }
    }
}
