use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Customer, OrderId, OrderNumber, Product, ProductId, Result, TaxId};

/// Resolves product references against the catalog.
///
/// `Ok(None)` means the product does not exist. `Err` is reserved for
/// failures of the backing service itself.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// Finds a product by its reference.
    async fn find_product(&self, product_id: &ProductId) -> Result<Option<Product>>;
}

/// Resolves customers by tax identifier.
#[async_trait]
pub trait CustomerLookup: Send + Sync {
    /// Finds the customer registered under `tax_id`.
    async fn find_by_tax_id(&self, tax_id: &TaxId) -> Result<Option<Customer>>;
}

/// Source of order numbers.
///
/// Implementations must never return the same value twice, including under
/// concurrent calls, and each value must be greater than every value returned
/// before it. Running out of numbers is reported as
/// [`StoreError::SequenceExhausted`](crate::StoreError::SequenceExhausted).
#[async_trait]
pub trait OrderSequence: Send + Sync {
    /// Returns the next order number.
    async fn next_order_number(&self) -> Result<OrderNumber>;
}

/// A serialized order as kept by an [`OrderStore`].
///
/// `status` is duplicated out of the payload so stores can filter on it and
/// check it during updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub status: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence for assembled orders.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order.
    ///
    /// Fails with `DuplicateOrder` if the order ID or number is already taken.
    async fn insert(&self, record: OrderRecord) -> Result<()>;

    /// Replaces a stored order.
    ///
    /// The write only happens if the stored status still equals
    /// `expected_status`; otherwise `ConcurrencyConflict` is returned and
    /// nothing changes.
    async fn update(&self, record: OrderRecord, expected_status: &str) -> Result<()>;

    /// Retrieves an order by ID.
    async fn get(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Retrieves all orders, lowest order number first.
    async fn list(&self) -> Result<Vec<OrderRecord>>;
}
