//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError};
use order_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Domain(err) => {
                let status = domain_error_status(&err);
                if status.is_server_error() {
                    tracing::error!(error = %err, kind = err.kind(), "request failed");
                }
                (status, err.kind(), err.to_string())
            }
        };

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Order(order_err) => match order_err {
            OrderError::InvalidRequest { .. }
            | OrderError::NoItems
            | OrderError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
            OrderError::ProductNotFound { .. } | OrderError::CustomerNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            OrderError::InvalidTransition { .. } => StatusCode::CONFLICT,
            OrderError::SequenceExhausted => StatusCode::SERVICE_UNAVAILABLE,
        },
        DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Store(StoreError::ConcurrencyConflict { .. })
        | DomainError::Store(StoreError::DuplicateOrder(_)) => StatusCode::CONFLICT,
        DomainError::Store(StoreError::OrderNotFound(_)) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use common::{OrderId, ProductId};
    use domain::OrderStatus;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                DomainError::from(OrderError::InvalidRequest {
                    reason: "empty".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::from(OrderError::ProductNotFound {
                    product_id: ProductId::new("P9"),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::from(OrderError::InvalidTransition {
                    from: OrderStatus::Received,
                    to: OrderStatus::Completed,
                }),
                StatusCode::CONFLICT,
            ),
            (
                DomainError::from(OrderError::SequenceExhausted),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DomainError::OrderNotFound(OrderId::new()),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::from(StoreError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(domain_error_status(&err), expected, "{err}");
        }
    }
}
