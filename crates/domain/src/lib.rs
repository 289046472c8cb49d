//! Domain layer of the food-order backend.
//!
//! This crate provides:
//! - the `Order` aggregate with its fulfillment state machine
//! - the order-assembly pipeline (`OrderItemAssembler`, `OrderFactory`)
//! - `OrderService`, which persists assembled orders and applies transitions

pub mod error;
pub mod order;

pub use common::{Customer, CustomerId, Money, OrderId, OrderNumber, Product, ProductId, TaxId};
pub use error::DomainError;
pub use order::{
    DEFAULT_LOOKUP_TIMEOUT, Order, OrderError, OrderFactory, OrderItem, OrderItemAssembler,
    OrderLine, OrderRequest, OrderService, OrderStatus,
};
