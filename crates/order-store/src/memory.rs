use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Customer, OrderId, OrderNumber, Product, ProductId, Result, StoreError, TaxId,
    store::{CustomerLookup, OrderRecord, OrderSequence, OrderStore, ProductLookup},
};

/// In-memory product and customer catalog.
///
/// Used by tests and by the API when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    customers: Arc<RwLock<HashMap<TaxId, Customer>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub async fn add_product(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    /// Adds or replaces a customer, keyed by tax ID.
    pub async fn add_customer(&self, customer: Customer) {
        self.customers
            .write()
            .await
            .insert(customer.tax_id.clone(), customer);
    }

    /// Returns the number of products in the catalog.
    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }

    /// Makes every subsequent lookup fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("catalog offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductLookup for InMemoryCatalog {
    async fn find_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        self.check_available()?;
        Ok(self.products.read().await.get(product_id).cloned())
    }
}

#[async_trait]
impl CustomerLookup for InMemoryCatalog {
    async fn find_by_tax_id(&self, tax_id: &TaxId) -> Result<Option<Customer>> {
        self.check_available()?;
        Ok(self.customers.read().await.get(tax_id).cloned())
    }
}

/// Process-local order sequence backed by an atomic counter.
///
/// Numbers start at `first` and run up to `last` inclusive. The counter never
/// wraps: once `last` has been handed out every call fails with
/// `SequenceExhausted`.
#[derive(Debug)]
pub struct AtomicOrderSequence {
    next: AtomicU64,
    last: u64,
}

impl AtomicOrderSequence {
    /// Creates a sequence starting at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a sequence starting at `first`, e.g. to continue after the
    /// highest number already persisted.
    pub fn starting_at(first: u64) -> Self {
        Self::with_range(first, u64::MAX - 1)
    }

    /// Creates a sequence handing out `first..=last`.
    pub fn with_range(first: u64, last: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
            last,
        }
    }

    /// Returns the number the next call would hand out.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for AtomicOrderSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderSequence for AtomicOrderSequence {
    async fn next_order_number(&self) -> Result<OrderNumber> {
        let last = self.last;
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if current > last {
                    None
                } else {
                    current.checked_add(1)
                }
            })
            .map(OrderNumber::new)
            .map_err(|_| StoreError::SequenceExhausted)
    }
}

/// In-memory order store implementation for testing.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns the highest order number stored, if any.
    pub async fn max_order_number(&self) -> Option<OrderNumber> {
        self.orders
            .read()
            .await
            .values()
            .map(|r| r.order_number)
            .max()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, record: OrderRecord) -> Result<()> {
        let mut orders = self.orders.write().await;

        let taken = orders.contains_key(&record.order_id)
            || orders
                .values()
                .any(|r| r.order_number == record.order_number);
        if taken {
            return Err(StoreError::DuplicateOrder(record.order_id));
        }

        orders.insert(record.order_id, record);
        Ok(())
    }

    async fn update(&self, record: OrderRecord, expected_status: &str) -> Result<()> {
        let mut orders = self.orders.write().await;

        let current = orders
            .get_mut(&record.order_id)
            .ok_or(StoreError::OrderNotFound(record.order_id))?;

        if current.status != expected_status {
            return Err(StoreError::ConcurrencyConflict {
                order_id: record.order_id,
                expected: expected_status.to_string(),
                actual: current.status.clone(),
            });
        }

        *current = record;
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn list(&self) -> Result<Vec<OrderRecord>> {
        let mut records: Vec<_> = self.orders.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.order_number);
        Ok(records)
    }
}
