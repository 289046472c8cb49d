//! Order factory: turns a raw request into a valid `Order`.

use std::sync::Arc;
use std::time::Duration;

use common::{Customer, OrderNumber, TaxId};
use order_store::{CustomerLookup, OrderSequence, ProductLookup, StoreError};

use crate::error::DomainError;

use super::assembler::DEFAULT_LOOKUP_TIMEOUT;
use super::{Order, OrderError, OrderItemAssembler, OrderRequest};

/// Assembles orders from requests.
///
/// Holds no per-request state, so one factory can serve any number of
/// concurrent requests.
#[derive(Clone)]
pub struct OrderFactory {
    assembler: OrderItemAssembler,
    customers: Arc<dyn CustomerLookup>,
    sequence: Arc<dyn OrderSequence>,
    lookup_timeout: Duration,
}

impl OrderFactory {
    /// Creates a factory over the given collaborators.
    pub fn new(
        products: Arc<dyn ProductLookup>,
        customers: Arc<dyn CustomerLookup>,
        sequence: Arc<dyn OrderSequence>,
    ) -> Self {
        Self {
            assembler: OrderItemAssembler::new(products),
            customers,
            sequence,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Overrides the timeout applied to each product and customer lookup.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.assembler = self.assembler.with_lookup_timeout(timeout);
        self.lookup_timeout = timeout;
        self
    }

    /// Assembles an order from a request.
    ///
    /// 1. Rejects malformed requests before touching any collaborator.
    /// 2. Draws the order number.
    /// 3. Resolves items and the customer concurrently.
    /// 4. Builds the order in `Received`.
    ///
    /// A supplied tax ID that does not resolve fails with `CustomerNotFound`;
    /// the order is never downgraded to anonymous. Nothing is built unless
    /// every step succeeded.
    #[tracing::instrument(
        skip(self, request),
        fields(items = request.items.len(), identified = request.customer_tax_id().is_some())
    )]
    pub async fn assemble_order(&self, request: OrderRequest) -> Result<Order, DomainError> {
        let quantities = request.validate()?;

        let number = self.next_number().await?;

        let (items, customer) = tokio::try_join!(
            self.assembler.resolve_lines(&request.items, quantities),
            self.resolve_customer(request.customer_tax_id()),
        )?;

        let order = Order::new(number, items, customer)?;

        tracing::debug!(
            order_id = %order.id(),
            order_number = %order.number(),
            anonymous = order.is_anonymous(),
            "order assembled"
        );
        Ok(order)
    }

    async fn next_number(&self) -> Result<OrderNumber, DomainError> {
        self.sequence
            .next_order_number()
            .await
            .map_err(|e| match e {
                StoreError::SequenceExhausted => {
                    tracing::error!("order number sequence exhausted");
                    DomainError::Order(OrderError::SequenceExhausted)
                }
                other => DomainError::Store(other),
            })
    }

    async fn resolve_customer(
        &self,
        tax_id: Option<&TaxId>,
    ) -> Result<Option<Customer>, DomainError> {
        let Some(tax_id) = tax_id else {
            return Ok(None);
        };

        let lookup = self.customers.find_by_tax_id(tax_id);
        let customer = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(found) => found?,
            Err(_) => {
                tracing::warn!(timeout = ?self.lookup_timeout, "customer lookup timed out");
                None
            }
        };

        match customer {
            Some(customer) => Ok(Some(customer)),
            None => Err(OrderError::CustomerNotFound {
                tax_id: tax_id.clone(),
            }
            .into()),
        }
    }
}
