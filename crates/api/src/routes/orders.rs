//! Checkout and order status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use checkout::{
    ActiveOrderGuard, CartService, DispatchOutcome, Identity, OrderCreationService,
    PaymentConfirmer, PaymentDispatcher, PollingConfig, SessionPoller, display_status,
};
use chrono::Utc;
use common::{OrderId, UserId};
use domain::{OrderDescriptor, PaymentMethod, eta};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub carts: CartService<S>,
    pub creation: OrderCreationService<S>,
    pub dispatcher: PaymentDispatcher<S>,
    pub guard: ActiveOrderGuard<S>,
    pub store: S,
    pub polling: PollingConfig,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub user_id: Option<uuid::Uuid>,
    pub payment_method: String,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: uuid::Uuid,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub image: Option<String>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub time: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub payment: String,
}

impl OrderResponse {
    fn from_descriptor(order: &OrderDescriptor) -> Self {
        Self {
            id: order.order_id.to_string(),
            order_number: order.order_number.clone(),
            time: order.created_at.to_rfc3339(),
            status: order.status.to_string(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    name: item.name.clone(),
                    unit_price_cents: item.unit_price.cents(),
                    quantity: item.quantity,
                    image: item.image.clone(),
                })
                .collect(),
            total_cents: order.total.cents(),
            payment: order.payment_method.label().to_string(),
        }
    }
}

/// How the payment proceeds after checkout.
#[derive(Serialize)]
pub struct PaymentHandoffResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub estimated_prep_minutes: i64,
    pub payment: PaymentHandoffResponse,
}

#[derive(Serialize)]
pub struct EtaResponse {
    pub order_id: String,
    pub queue_position: u32,
    pub eta_minutes: i64,
    pub ready_at: String,
    pub remaining_seconds: i64,
    pub display_status: String,
}

// -- Handlers --

/// POST /checkout — create an order from the user's persisted cart and
/// dispatch its payment.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(axum::http::StatusCode, Json<CheckoutResponse>), ApiError> {
    let method = PaymentMethod::from_code(&req.payment_method).ok_or_else(|| {
        ApiError::BadRequest(format!("Unknown payment method '{}'", req.payment_method))
    })?;

    let identity = match req.user_id {
        Some(uuid) => Identity::customer(UserId::from_uuid(uuid)),
        None => Identity::Guest,
    };
    let user_id = identity
        .require_active_customer()
        .map_err(ApiError::Checkout)?;

    let mut hydrated = state.carts.load_for_user(user_id).await?;
    let created = state
        .creation
        .create_order(&mut hydrated, method, &identity)
        .await?;

    // Dispatch failure leaves the order pending and recoverable; the
    // response reports it instead of discarding the created order.
    let payment = match state.dispatcher.dispatch(&created.order).await {
        Ok(DispatchOutcome::Confirmed) => PaymentHandoffResponse {
            status: "confirmed",
            redirect_url: None,
            payment_session_id: None,
            error: None,
        },
        Ok(DispatchOutcome::Redirect {
            redirect_url,
            session_id,
        }) => {
            // Watch the session in the background and record the outcome.
            let poller = SessionPoller::new(state.store.clone(), state.polling);
            let confirmer = Arc::new(PaymentConfirmer::new(state.store.clone()));
            if poller.start(session_id.clone(), confirmer).await.is_ok() {
                tokio::spawn(async move {
                    let _ = poller.outcome().await;
                });
            }
            PaymentHandoffResponse {
                status: "redirect",
                redirect_url: Some(redirect_url),
                payment_session_id: Some(session_id.as_str().to_string()),
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(order_id = %created.order.order_id, error = %e, "payment dispatch failed");
            PaymentHandoffResponse {
                status: "dispatch_failed",
                redirect_url: None,
                payment_session_id: None,
                error: Some(e.to_string()),
            }
        }
    };

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CheckoutResponse {
            order: OrderResponse::from_descriptor(&created.order),
            estimated_prep_minutes: created.estimated_prep_minutes,
            payment,
        }),
    ))
}

/// GET /orders/{id} — load a persisted order descriptor.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .store
        .order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from_descriptor(&order)))
}

/// GET /orders/active — the user's newest non-terminal order.
#[tracing::instrument(skip(state))]
pub async fn active<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .guard
        .active_order(UserId::from_uuid(query.user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("No active order".to_string()))?;

    Ok(Json(OrderResponse::from_descriptor(&order)))
}

/// GET /orders/{id}/eta — countdown snapshot for an order.
#[tracing::instrument(skip(state))]
pub async fn order_eta<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<EtaResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .store
        .order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    let queue_position = state.store.queue_position(order_id).await?;
    let eta_minutes = eta::eta_minutes(order.total_quantity(), queue_position);
    let ready_at = eta::ready_at(order.created_at, eta_minutes);
    let remaining_seconds = eta::remaining_seconds(ready_at, Utc::now());

    Ok(Json(EtaResponse {
        order_id: order_id.to_string(),
        queue_position,
        eta_minutes,
        ready_at: ready_at.to_rfc3339(),
        remaining_seconds,
        display_status: display_status(order.status, remaining_seconds).to_string(),
    }))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
