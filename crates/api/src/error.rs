//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout workflow error.
    Checkout(CheckoutError),
    /// Store error outside the checkout workflow.
    Store(StoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // The guard outcome carries the existing order so the client can
        // navigate to its status view.
        if let ApiError::Checkout(CheckoutError::ActiveOrderExists { order_id, status }) = &self {
            let body = serde_json::json!({
                "error": self.to_message(),
                "active_order_id": order_id.to_string(),
                "active_order_status": status.to_string(),
            });
            return (StatusCode::CONFLICT, axum::Json(body)).into_response();
        }

        let (status, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl ApiError {
    fn to_message(&self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::Checkout(err) => err.to_string(),
            ApiError::Store(err) => err.to_string(),
        }
    }
}

fn checkout_error_to_response(err: &CheckoutError) -> (StatusCode, String) {
    match err {
        CheckoutError::EmptyCart | CheckoutError::Cart(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        CheckoutError::AuthenticationRequired => (StatusCode::UNAUTHORIZED, err.to_string()),
        CheckoutError::AccountSuspended => (StatusCode::FORBIDDEN, err.to_string()),
        CheckoutError::ActiveOrderExists { .. } => (StatusCode::CONFLICT, err.to_string()),
        CheckoutError::GatewayProtocol(_)
        | CheckoutError::GatewayTransport(_)
        | CheckoutError::GatewayRejected(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        CheckoutError::Insert { .. } => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        CheckoutError::Store(store_err) => store_error_to_response(store_err),
    }
}

fn store_error_to_response(err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::OrderNotFound(_) | StoreError::UnknownProduct(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        StoreError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
