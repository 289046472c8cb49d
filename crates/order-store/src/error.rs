use thiserror::Error;

use crate::OrderId;

/// Errors that can occur when talking to a lookup, sequence or order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order-number sequence cannot produce another value.
    #[error("Order number sequence exhausted")]
    SequenceExhausted,

    /// The stored order changed since it was loaded.
    #[error(
        "Concurrency conflict for order {order_id}: expected status {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: String,
        actual: String,
    },

    /// The order was not found in the store.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with the same ID or number is already stored.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The backing service refused or failed the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
