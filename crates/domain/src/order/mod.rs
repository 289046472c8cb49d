//! Order aggregate and the pipeline that assembles it.

mod aggregate;
mod assembler;
mod factory;
mod service;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use assembler::{DEFAULT_LOOKUP_TIMEOUT, OrderItemAssembler};
pub use factory::OrderFactory;
pub use service::OrderService;
pub use state::OrderStatus;
pub use value_objects::{OrderItem, OrderLine, OrderRequest};

use common::{ProductId, TaxId};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request is malformed; detected before any lookup.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A requested product does not exist.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// The supplied tax ID does not belong to a known customer.
    #[error("Customer not found for tax id {tax_id}")]
    CustomerNotFound { tax_id: TaxId },

    /// No more order numbers can be issued.
    #[error("Order number sequence exhausted")]
    SequenceExhausted,

    /// The requested status change is not allowed from the current status.
    #[error("Invalid transition: cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },
}

impl OrderError {
    /// Short machine-readable name, used as a metrics label and in API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::InvalidRequest { .. } => "invalid_request",
            OrderError::ProductNotFound { .. } => "product_not_found",
            OrderError::CustomerNotFound { .. } => "customer_not_found",
            OrderError::SequenceExhausted => "sequence_exhausted",
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::NoItems => "no_items",
            OrderError::InvalidQuantity { .. } => "invalid_quantity",
        }
    }
}
