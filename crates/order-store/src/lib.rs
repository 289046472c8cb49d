//! Collaborators of the order-assembly pipeline.
//!
//! - [`ProductLookup`] and [`CustomerLookup`] resolve catalog records
//! - [`OrderSequence`] hands out order numbers
//! - [`OrderStore`] persists serialized orders
//!
//! Each trait has an in-memory implementation and a PostgreSQL one.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{Customer, OrderId, OrderNumber, Product, ProductId, TaxId};
pub use error::{Result, StoreError};
pub use memory::{AtomicOrderSequence, InMemoryCatalog, InMemoryOrderStore};
pub use postgres::{PostgresCatalog, PostgresOrderSequence, PostgresOrderStore, run_migrations};
pub use store::{CustomerLookup, OrderRecord, OrderSequence, OrderStore, ProductLookup};
