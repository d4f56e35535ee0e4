//! Payment session and deep-link return endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::PaymentSessionId;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub order_id: String,
    pub status: String,
    pub amount_cents: i64,
    pub method: String,
    pub updated_at: String,
}

/// GET /payments/sessions/{id} — read a payment session's status.
#[tracing::instrument(skip(state))]
pub async fn session<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .store
        .payment_session(&PaymentSessionId::new(id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Payment session {id} not found")))?;

    Ok(Json(SessionResponse {
        id: session.session_id.to_string(),
        order_id: session.order_id.to_string(),
        status: session.status.to_string(),
        amount_cents: session.amount.cents(),
        method: session.method.code().to_string(),
        updated_at: session.updated_at.to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    pub status: String,
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct ReturnAckResponse {
    pub acknowledged: bool,
    pub status: String,
    pub confirmed: bool,
    pub message: &'static str,
}

/// GET /payments/return — deep-link return acknowledgement.
///
/// The app resumes here after the external checkout page closes. The
/// carried status is a hint only and never confirms the payment; the
/// polled session (webhook-updated) record is the confirmation channel.
#[tracing::instrument]
pub async fn checkout_return(
    Query(query): Query<ReturnQuery>,
) -> Result<Json<ReturnAckResponse>, ApiError> {
    if query.status != "success" && query.status != "failed" {
        return Err(ApiError::BadRequest(format!(
            "Unknown return status '{}'",
            query.status
        )));
    }

    tracing::info!(
        status = %query.status,
        session_id = query.session_id.as_deref().unwrap_or(""),
        "checkout return received"
    );

    Ok(Json(ReturnAckResponse {
        acknowledged: true,
        status: query.status,
        confirmed: false,
        message: "Payment confirmation is pending; poll the payment session for the outcome",
    }))
}
