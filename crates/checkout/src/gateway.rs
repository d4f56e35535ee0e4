//! Payment gateway contract and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use domain::{Money, PaymentMethod, PaymentSession, PaymentSessionId, SessionStatus};
use serde::{Deserialize, Serialize};
use store::InMemoryStore;
use thiserror::Error;
use uuid::Uuid;

/// Request sent to the hosted payment gateway function.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayRequest {
    /// Amount to charge, in centavos.
    pub amount: i64,

    /// Wire code of the payment method ("cash" or "paymongo").
    pub payment_method_type: String,

    /// The order being paid for.
    pub order_id: String,

    /// The paying user.
    pub user_id: String,
}

/// Response from the gateway function.
///
/// Cash responses carry only status and message; redirect responses add
/// the checkout URL and session id. Every field is optional because the
/// response shape is validated by the dispatcher, not trusted here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayResponse {
    /// Gateway-reported outcome, usually "success".
    pub status: Option<String>,

    /// Human-readable note from the gateway.
    pub message: Option<String>,

    /// Hosted checkout page to open externally.
    pub redirect_url: Option<String>,

    /// Identifier of the checkout session to poll.
    pub payment_session_id: Option<String>,
}

/// Errors from invoking the gateway function.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached or answered garbage.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The gateway answered with an error status.
    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },
}

/// Remote callable that opens payment sessions.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a checkout session (or accepts cash) for an order.
    async fn create_session(&self, request: &GatewayRequest)
    -> Result<GatewayResponse, GatewayError>;
}

#[derive(Debug, Default)]
struct GatewayState {
    next_id: u32,
    fail_transport: bool,
    omit_session_id: bool,
    requests: Vec<GatewayRequest>,
}

/// In-memory gateway for tests and local development.
///
/// Writes the pending session row into the backing store, standing in for
/// the hosted gateway and its webhook side.
#[derive(Clone)]
pub struct InMemoryGateway {
    store: InMemoryStore,
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryGateway {
    /// Creates a gateway backed by the given store.
    pub fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            state: Arc::new(RwLock::new(GatewayState::default())),
        }
    }

    /// Configures the gateway to fail with a transport error.
    pub fn set_fail_transport(&self, fail: bool) {
        self.state.write().unwrap().fail_transport = fail;
    }

    /// Configures the gateway to omit the session id from responses.
    pub fn set_omit_session_id(&self, omit: bool) {
        self.state.write().unwrap().omit_session_id = omit;
    }

    /// Returns the number of requests received.
    pub fn request_count(&self) -> usize {
        self.state.read().unwrap().requests.len()
    }

    /// Returns the most recent request, if any.
    pub fn last_request(&self) -> Option<GatewayRequest> {
        self.state.read().unwrap().requests.last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_session(
        &self,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let (session_id, omit_session_id) = {
            let mut state = self.state.write().unwrap();
            if state.fail_transport {
                return Err(GatewayError::Transport("gateway unreachable".to_string()));
            }
            state.requests.push(request.clone());
            state.next_id += 1;
            (format!("cs_test_{:04}", state.next_id), state.omit_session_id)
        };

        let method = PaymentMethod::from_code(&request.payment_method_type).ok_or_else(|| {
            GatewayError::Upstream {
                status: 400,
                message: format!(
                    "unsupported payment_method_type '{}'",
                    request.payment_method_type
                ),
            }
        })?;

        if method == PaymentMethod::Cash {
            return Ok(GatewayResponse {
                status: Some("success".to_string()),
                message: Some("cash payment accepted".to_string()),
                ..Default::default()
            });
        }

        let order_id = Uuid::parse_str(&request.order_id)
            .map(OrderId::from_uuid)
            .map_err(|e| GatewayError::Upstream {
                status: 400,
                message: format!("invalid order_id: {e}"),
            })?;

        let now = Utc::now();
        self.store
            .put_session(PaymentSession {
                session_id: PaymentSessionId::new(session_id.clone()),
                order_id,
                status: SessionStatus::Pending,
                amount: Money::from_cents(request.amount),
                method,
                created_at: now,
                updated_at: now,
            })
            .await;

        Ok(GatewayResponse {
            status: Some("success".to_string()),
            message: None,
            redirect_url: Some(format!("https://checkout.example/sessions/{session_id}")),
            payment_session_id: if omit_session_id { None } else { Some(session_id) },
        })
    }
}
