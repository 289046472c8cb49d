//! Shared types for the food-order backend.

pub mod records;
pub mod types;

pub use records::{Customer, Product};
pub use types::{CustomerId, Money, OrderId, OrderNumber, ProductId, TaxId};
