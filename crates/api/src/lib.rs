//! HTTP API server for the food-order backend.
//!
//! Provides REST endpoints for placing orders and moving them through
//! fulfillment, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use common::{Customer, Money, Product};
use domain::{OrderFactory, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{
    AtomicOrderSequence, InMemoryCatalog, InMemoryOrderStore, PostgresCatalog,
    PostgresOrderSequence, PostgresOrderStore, StoreError,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::{AppState, Storage};

/// Tax ID of the customer registered by the demo menu.
pub const DEMO_CUSTOMER_TAX_ID: &str = "123.456.789-00";

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create).get(routes::orders::list),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/status", post(routes::orders::transition))
        .route("/orders/{id}/advance", post(routes::orders::advance))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Registers descriptions for the metrics the order service emits.
pub fn describe_metrics() {
    metrics::describe_counter!("orders_placed_total", "Orders assembled and stored");
    metrics::describe_counter!(
        "orders_rejected_total",
        "Order requests rejected during assembly, by reason"
    );
    metrics::describe_counter!(
        "order_transitions_total",
        "Order status changes, by source and target status"
    );
    metrics::describe_histogram!(
        "order_assembly_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent assembling an order from a request"
    );
}

/// Products and customer loaded when `SEED_DEMO_MENU` is enabled.
pub fn demo_menu() -> (Vec<Product>, Vec<Customer>) {
    let products = vec![
        Product::new("P1", "X-Burger", Money::from_cents(2500))
            .with_description("Beef patty, cheese, lettuce and tomato"),
        Product::new("P2", "French Fries", Money::from_cents(900)),
        Product::new("P3", "Soda", Money::from_cents(700)),
        Product::new("P4", "Chocolate Milkshake", Money::from_cents(1500)),
    ];
    let customers = vec![
        Customer::new(DEMO_CUSTOMER_TAX_ID, "Ana Souza", "ana.souza@example.com")
            .with_phone("+55 11 99999-0000"),
    ];
    (products, customers)
}

/// Creates application state backed by in-memory stores.
pub async fn create_in_memory_state(config: &Config) -> Arc<AppState> {
    let catalog = Arc::new(InMemoryCatalog::new());
    if config.seed_demo_menu {
        let (products, customers) = demo_menu();
        for product in products {
            catalog.add_product(product).await;
        }
        for customer in customers {
            catalog.add_customer(customer).await;
        }
        tracing::info!(products = catalog.product_count().await, "demo menu loaded");
    }

    let factory = OrderFactory::new(
        catalog.clone(),
        catalog,
        Arc::new(AtomicOrderSequence::new()),
    )
    .with_lookup_timeout(config.lookup_timeout);

    Arc::new(AppState {
        order_service: OrderService::new(factory, Arc::new(InMemoryOrderStore::new())),
        storage: Storage::Memory,
    })
}

/// Creates application state backed by PostgreSQL.
///
/// Expects the migrations to have been applied.
pub async fn create_postgres_state(
    pool: PgPool,
    config: &Config,
) -> Result<Arc<AppState>, StoreError> {
    let catalog = Arc::new(PostgresCatalog::new(pool.clone()));
    if config.seed_demo_menu {
        let (products, customers) = demo_menu();
        for product in &products {
            catalog.upsert_product(product).await?;
        }
        for customer in &customers {
            catalog.upsert_customer(customer).await?;
        }
        tracing::info!(products = products.len(), "demo menu loaded");
    }

    let factory = OrderFactory::new(
        catalog.clone(),
        catalog,
        Arc::new(PostgresOrderSequence::new(pool.clone())),
    )
    .with_lookup_timeout(config.lookup_timeout);

    Ok(Arc::new(AppState {
        order_service: OrderService::new(factory, Arc::new(PostgresOrderStore::new(pool))),
        storage: Storage::Postgres,
    }))
}
