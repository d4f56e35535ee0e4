//! Payment value types: method, statuses, sessions, and records.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::value_objects::Money;

/// How an order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Pay in cash at pickup; confirmed without any external call.
    Cash,

    /// Pay through the hosted gateway's redirect checkout page.
    GatewayRedirect,
}

impl PaymentMethod {
    /// Returns the wire code sent to the gateway function.
    pub fn code(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::GatewayRedirect => "paymongo",
        }
    }

    /// Parses a wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "cash" => Some(PaymentMethod::Cash),
            "paymongo" => Some(PaymentMethod::GatewayRedirect),
            _ => None,
        }
    }

    /// Returns the label shown on order summaries.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::GatewayRedirect => "Online payment",
        }
    }

    /// Returns the payment provider name recorded on the payment row.
    ///
    /// Cash payments carry no provider.
    pub fn provider(&self) -> Option<&'static str> {
        match self {
            PaymentMethod::Cash => None,
            PaymentMethod::GatewayRedirect => Some("paymongo"),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lifecycle status of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Payment created, nothing confirmed yet.
    #[default]
    Pending,

    /// A gateway checkout session exists for this payment.
    Processing,

    /// Payment confirmed by the gateway.
    Succeeded,

    /// Payment was declined or failed upstream.
    Failed,

    /// The checkout session expired before completion.
    Expired,
}

impl PaymentStatus {
    /// Returns true if no further status changes are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded | PaymentStatus::Failed | PaymentStatus::Expired
        )
    }

    /// Returns the lowercase code used in persisted rows.
    pub fn code(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }

    /// Parses a persisted status code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pending" => Some(PaymentStatus::Pending),
            "processing" => Some(PaymentStatus::Processing),
            "succeeded" => Some(PaymentStatus::Succeeded),
            "failed" => Some(PaymentStatus::Failed),
            "expired" => Some(PaymentStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Status of a hosted checkout session as reported by the gateway side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The payer has not completed checkout yet.
    #[default]
    Pending,

    /// Checkout completed and the charge went through.
    Success,

    /// The charge failed.
    Failed,

    /// The session lapsed before the payer completed checkout.
    Expired,
}

impl SessionStatus {
    /// Returns true if the session will not change status again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }

    /// Returns the lowercase code used in persisted rows.
    pub fn code(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Success => "success",
            SessionStatus::Failed => "failed",
            SessionStatus::Expired => "expired",
        }
    }

    /// Parses a persisted status code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pending" => Some(SessionStatus::Pending),
            "success" => Some(SessionStatus::Success),
            "failed" => Some(SessionStatus::Failed),
            "expired" => Some(SessionStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Opaque identifier of a hosted checkout session, assigned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentSessionId(String);

impl PaymentSessionId {
    /// Creates a session ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the session ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaymentSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PaymentSessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PaymentSessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A hosted checkout session, read-only from the client's perspective.
///
/// The gateway/webhook side owns every mutation; this process only ever
/// reads it while polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Gateway-assigned session identifier.
    pub session_id: PaymentSessionId,

    /// The order this session pays for.
    pub order_id: OrderId,

    /// Current session status.
    pub status: SessionStatus,

    /// Amount the session charges.
    pub amount: Money,

    /// Payment method the session was created for.
    pub method: PaymentMethod,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// When the session status last changed.
    pub updated_at: DateTime<Utc>,
}

/// Payment row persisted alongside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// The order this payment belongs to.
    pub order_id: OrderId,

    /// The paying user.
    pub user_id: UserId,

    /// How the order is paid.
    pub method: PaymentMethod,

    /// Amount due.
    pub amount: Money,

    /// Current payment status.
    pub status: PaymentStatus,

    /// Provider name; None for cash.
    pub provider: Option<String>,

    /// Provider-side intent/session identifier once one exists.
    pub provider_intent_id: Option<String>,
}

impl PaymentRecord {
    /// Creates the initial pending payment row for a new order.
    pub fn pending(order_id: OrderId, user_id: UserId, method: PaymentMethod, amount: Money) -> Self {
        Self {
            order_id,
            user_id,
            method,
            amount,
            status: PaymentStatus::Pending,
            provider: method.provider().map(str::to_string),
            provider_intent_id: None,
        }
    }
}
