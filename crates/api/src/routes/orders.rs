//! Order placement, lookup and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, TaxId};
use domain::{Order, OrderItem, OrderLine, OrderRequest, OrderService, OrderStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Which backend holds catalog and order data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Memory,
    Postgres,
}

impl Storage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Storage::Memory => "memory",
            Storage::Postgres => "postgres",
        }
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub order_service: OrderService,
    pub storage: Storage,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub customer_tax_id: Option<String>,
}

#[derive(Deserialize)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

impl From<PlaceOrderRequest> for OrderRequest {
    fn from(req: PlaceOrderRequest) -> Self {
        let lines = req
            .items
            .into_iter()
            .map(|line| OrderLine::new(line.product_id, line.quantity))
            .collect();

        OrderRequest {
            items: lines,
            customer_tax_id: req.customer_tax_id.map(TaxId::new),
        }
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: u64,
    pub status: OrderStatus,
    pub anonymous: bool,
    pub customer: Option<CustomerResponse>,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct CustomerResponse {
    pub id: String,
    pub tax_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id().to_string(),
            product_name: item.product().name.clone(),
            quantity: item.quantity(),
            unit_price_cents: item.unit_price().cents(),
            total_cents: item.total_price().cents(),
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            order_number: order.number().value(),
            status: order.status(),
            anonymous: order.is_anonymous(),
            customer: order.customer().map(|c| CustomerResponse {
                id: c.id.to_string(),
                tax_id: c.tax_id.to_string(),
                name: c.name.clone(),
                email: c.email.clone(),
            }),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
            total_cents: order.total_amount().cents(),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders: assemble and store a new order.
#[tracing::instrument(skip(state, req), fields(items = req.items.len()))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.order_service.place_order(req.into()).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id}: load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .order_service
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders: list all orders, lowest order number first.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.order_service.list_orders().await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// POST /orders/{id}/status: move an order to the requested status.
#[tracing::instrument(skip(state, req))]
pub async fn transition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let target = req
        .status
        .parse::<OrderStatus>()
        .map_err(domain::DomainError::from)?;

    let order = state.order_service.transition_order(order_id, target).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/advance: move an order one step along the happy path.
#[tracing::instrument(skip(state))]
pub async fn advance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.order_service.advance_order(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/cancel: cancel an order that has not reached `Ready`.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.order_service.cancel_order(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
