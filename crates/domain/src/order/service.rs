//! Order service: assembles, persists and moves orders through fulfillment.

use std::sync::Arc;
use std::time::Instant;

use common::OrderId;
use order_store::{OrderRecord, OrderStore};

use crate::error::DomainError;

use super::{Order, OrderFactory, OrderRequest, OrderStatus};

/// Service for managing orders.
///
/// Provides a high-level API over the factory and an order store.
#[derive(Clone)]
pub struct OrderService {
    factory: OrderFactory,
    store: Arc<dyn OrderStore>,
}

impl OrderService {
    /// Creates a new order service.
    pub fn new(factory: OrderFactory, store: Arc<dyn OrderStore>) -> Self {
        Self { factory, store }
    }

    /// Assembles an order and stores it.
    ///
    /// Only fully assembled orders reach the store.
    #[tracing::instrument(skip(self, request))]
    pub async fn place_order(&self, request: OrderRequest) -> Result<Order, DomainError> {
        let start = Instant::now();

        let order = match self.factory.assemble_order(request).await {
            Ok(order) => order,
            Err(err) => {
                tracing::info!(reason = err.kind(), error = %err, "order rejected");
                metrics::counter!("orders_rejected_total", "reason" => err.kind()).increment(1);
                return Err(err);
            }
        };
        metrics::histogram!("order_assembly_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        self.store.insert(to_record(&order)?).await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            order_number = %order.number(),
            items = order.item_count(),
            "order placed"
        );
        Ok(order)
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        self.store
            .get(order_id)
            .await?
            .map(from_record)
            .transpose()
    }

    /// Loads all orders, lowest order number first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        self.store
            .list()
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }

    /// Moves an order to `target`.
    #[tracing::instrument(skip(self))]
    pub async fn transition_order(
        &self,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, DomainError> {
        self.update(order_id, |order| order.transition_to(target).map(|_| ()))
            .await
    }

    /// Moves an order one step forward along the happy path.
    #[tracing::instrument(skip(self))]
    pub async fn advance_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.update(order_id, |order| order.advance().map(|_| ()))
            .await
    }

    /// Cancels an order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.update(order_id, |order| order.cancel().map(|_| ()))
            .await
    }

    /// Loads an order, applies `change` and writes it back, guarded by the
    /// status it was loaded with.
    async fn update<F>(&self, order_id: OrderId, change: F) -> Result<Order, DomainError>
    where
        F: FnOnce(&mut Order) -> Result<(), super::OrderError>,
    {
        let mut order = self
            .get_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;
        let previous = order.status();

        change(&mut order)?;

        self.store
            .update(to_record(&order)?, previous.as_str())
            .await?;

        metrics::counter!(
            "order_transitions_total",
            "from" => previous.as_str(),
            "to" => order.status().as_str()
        )
        .increment(1);
        tracing::info!(
            %order_id,
            from = %previous,
            to = %order.status(),
            "order status changed"
        );
        Ok(order)
    }
}

fn to_record(order: &Order) -> Result<OrderRecord, DomainError> {
    Ok(OrderRecord {
        order_id: order.id(),
        order_number: order.number(),
        status: order.status().as_str().to_string(),
        payload: serde_json::to_value(order)?,
        created_at: order.created_at(),
        updated_at: order.updated_at(),
    })
}

fn from_record(record: OrderRecord) -> Result<Order, DomainError> {
    Ok(serde_json::from_value(record.payload)?)
}

#[cfg(test)]
mod tests {
    use common::{Money, Product};
    use order_store::{AtomicOrderSequence, InMemoryCatalog, InMemoryOrderStore, StoreError};

    use super::*;
    use crate::order::{OrderError, OrderLine};

    async fn create_service() -> (OrderService, InMemoryOrderStore) {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog
            .add_product(Product::new("P1", "X-Burger", Money::from_cents(2500)))
            .await;
        catalog
            .add_product(Product::new("P2", "Soda", Money::from_cents(700)))
            .await;

        let factory = OrderFactory::new(
            catalog.clone(),
            catalog,
            Arc::new(AtomicOrderSequence::new()),
        );
        let store = InMemoryOrderStore::new();
        (OrderService::new(factory, Arc::new(store.clone())), store)
    }

    fn request() -> OrderRequest {
        OrderRequest::new(vec![OrderLine::new("P1", 2), OrderLine::new("P2", 1)])
    }

    #[tokio::test]
    async fn test_place_order_persists_it() {
        let (service, store) = create_service().await;

        let order = service.place_order(request()).await.unwrap();

        assert_eq!(store.order_count().await, 1);
        let loaded = service.get_order(order.id()).await.unwrap().unwrap();
        assert_eq!(loaded, order);
        assert_eq!(loaded.total_amount().cents(), 5700);
    }

    #[tokio::test]
    async fn test_rejected_order_is_not_persisted() {
        let (service, store) = create_service().await;

        let result = service
            .place_order(OrderRequest::new(vec![
                OrderLine::new("P1", 1),
                OrderLine::new("P_missing", 1),
            ]))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::ProductNotFound { .. }))
        ));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_get_unknown_order() {
        let (service, _) = create_service().await;
        assert!(service.get_order(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (service, _) = create_service().await;
        let order = service.place_order(request()).await.unwrap();

        service.advance_order(order.id()).await.unwrap();
        service.advance_order(order.id()).await.unwrap();
        let order = service.advance_order(order.id()).await.unwrap();

        assert_eq!(order.status(), OrderStatus::Completed);
        let stored = service.get_order(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_invalid_transition_leaves_stored_status() {
        let (service, _) = create_service().await;
        let order = service.place_order(request()).await.unwrap();

        let result = service
            .transition_order(order.id(), OrderStatus::Completed)
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidTransition { .. }))
        ));
        let stored = service.get_order(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Received);
    }

    #[tokio::test]
    async fn test_cancel_order() {
        let (service, _) = create_service().await;
        let order = service.place_order(request()).await.unwrap();

        let order = service.cancel_order(order.id()).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_transition_unknown_order() {
        let (service, _) = create_service().await;
        let result = service.advance_order(OrderId::new()).await;
        assert!(matches!(result, Err(DomainError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected() {
        let (service, store) = create_service().await;
        let order = service.place_order(request()).await.unwrap();

        // another writer moved the order on after we loaded it
        let mut stale = order.clone();
        service.advance_order(order.id()).await.unwrap();
        stale.cancel().unwrap();

        let result = store.update(to_record(&stale).unwrap(), "Received").await;
        assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_rejected_on_load() {
        let (service, store) = create_service().await;
        let order = service.place_order(request()).await.unwrap();

        let mut record = to_record(&order).unwrap();
        record.payload["items"] = serde_json::json!([]);
        record.payload["customer"] = serde_json::to_value(common::Customer::new(
            "123.456.789-00",
            "Ana",
            "ana@example.com",
        ))
        .unwrap();
        store.update(record.clone(), "Received").await.unwrap();

        assert!(matches!(
            from_record(record),
            Err(DomainError::Serialization(_))
        ));
        assert!(matches!(
            service.get_order(order.id()).await,
            Err(DomainError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_list_orders_by_number() {
        let (service, _) = create_service().await;
        for _ in 0..3 {
            service.place_order(request()).await.unwrap();
        }

        let numbers: Vec<u64> = service
            .list_orders()
            .await
            .unwrap()
            .iter()
            .map(|o| o.number().value())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
