//! Builds order items from request lines.

use std::sync::Arc;
use std::time::Duration;

use common::ProductId;
use futures_util::future::join_all;
use order_store::ProductLookup;

use crate::error::DomainError;

use super::value_objects::validate_lines;
use super::{OrderError, OrderItem, OrderLine};

/// How long a single catalog lookup may take before it counts as a miss.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves request lines against the product catalog.
///
/// All lookups of one request run concurrently. The result is all or
/// nothing: one unresolved reference fails the whole assembly.
#[derive(Clone)]
pub struct OrderItemAssembler {
    products: Arc<dyn ProductLookup>,
    lookup_timeout: Duration,
}

impl OrderItemAssembler {
    /// Creates an assembler using the default lookup timeout.
    pub fn new(products: Arc<dyn ProductLookup>) -> Self {
        Self {
            products,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Overrides the per-lookup timeout.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Builds one item per line, in line order.
    ///
    /// Lines are validated before any lookup is issued.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn assemble(&self, lines: &[OrderLine]) -> Result<Vec<OrderItem>, DomainError> {
        let quantities = validate_lines(lines)?;
        self.resolve_lines(lines, quantities).await
    }

    /// Resolves lines that already passed validation, `quantities` being the
    /// validated quantity of each line.
    ///
    /// Every lookup finishes or times out before the result is decided. When
    /// several lines fail, the error reported belongs to the earliest of them
    /// in request order, whatever order the lookups completed in.
    pub(crate) async fn resolve_lines(
        &self,
        lines: &[OrderLine],
        quantities: Vec<u32>,
    ) -> Result<Vec<OrderItem>, DomainError> {
        let lookups = lines
            .iter()
            .zip(quantities)
            .map(|(line, quantity)| self.resolve(&line.product_id, quantity));

        join_all(lookups).await.into_iter().collect()
    }

    async fn resolve(&self, product_id: &ProductId, quantity: u32) -> Result<OrderItem, DomainError> {
        let lookup = self.products.find_product(product_id);

        let product = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(found) => found?,
            Err(_) => {
                tracing::warn!(%product_id, timeout = ?self.lookup_timeout, "product lookup timed out");
                None
            }
        };

        let product = product.ok_or_else(|| OrderError::ProductNotFound {
            product_id: product_id.clone(),
        })?;

        Ok(OrderItem::new(product, quantity)?)
    }
}

#[cfg(test)]
mod tests {
    use common::{Money, Product};
    use order_store::{InMemoryCatalog, StoreError};

    use super::*;

    async fn catalog() -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        catalog
            .add_product(Product::new("P1", "X-Burger", Money::from_cents(2500)))
            .await;
        catalog
            .add_product(Product::new("P2", "Fries", Money::from_cents(900)))
            .await;
        catalog
    }

    #[tokio::test]
    async fn test_assembles_items_in_order() {
        let assembler = OrderItemAssembler::new(Arc::new(catalog().await));

        let items = assembler
            .assemble(&[OrderLine::new("P2", 1), OrderLine::new("P1", 3)])
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id().as_str(), "P2");
        assert_eq!(items[1].product_id().as_str(), "P1");
        assert_eq!(items[1].quantity(), 3);
        assert_eq!(items[1].unit_price().cents(), 2500);
    }

    #[tokio::test]
    async fn test_missing_product_fails_whole_assembly() {
        let assembler = OrderItemAssembler::new(Arc::new(catalog().await));

        let result = assembler
            .assemble(&[OrderLine::new("P1", 1), OrderLine::new("P_missing", 1)])
            .await;

        match result {
            Err(DomainError::Order(OrderError::ProductNotFound { product_id })) => {
                assert_eq!(product_id.as_str(), "P_missing");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_earliest_missing_product_is_reported() {
        let assembler = OrderItemAssembler::new(Arc::new(catalog().await));

        let result = assembler
            .assemble(&[
                OrderLine::new("P1", 1),
                OrderLine::new("P_first", 1),
                OrderLine::new("P2", 1),
                OrderLine::new("P_second", 1),
            ])
            .await;

        match result {
            Err(DomainError::Order(OrderError::ProductNotFound { product_id })) => {
                assert_eq!(product_id.as_str(), "P_first");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected_before_lookup() {
        let catalog = catalog().await;
        catalog.set_unavailable(true);
        let assembler = OrderItemAssembler::new(Arc::new(catalog));

        // an unavailable catalog would fail any lookup, so InvalidRequest
        // proves validation ran first
        let result = assembler
            .assemble(&[OrderLine::new("P1", 1), OrderLine::new("P2", 0)])
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidRequest { .. }))
        ));
    }

    #[tokio::test]
    async fn test_empty_lines_rejected() {
        let assembler = OrderItemAssembler::new(Arc::new(catalog().await));
        let result = assembler.assemble(&[]).await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidRequest { .. }))
        ));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_a_missing_product() {
        let catalog = catalog().await;
        catalog.set_unavailable(true);
        let assembler = OrderItemAssembler::new(Arc::new(catalog));

        let result = assembler.assemble(&[OrderLine::new("P1", 1)]).await;
        assert!(matches!(
            result,
            Err(DomainError::Store(StoreError::Unavailable(_)))
        ));
    }
}
