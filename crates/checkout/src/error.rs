//! Checkout error taxonomy.

use common::OrderId;
use domain::{CartError, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Stage of the order-creation insert sequence.
///
/// The sequence is order -> payment -> items; a failure is tagged with
/// the stage that broke so callers know which rows already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStage {
    /// The order row insert.
    Order,

    /// The payment row insert.
    Payment,

    /// The order-line snapshot inserts.
    Items,
}

impl CreateStage {
    /// Returns the stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateStage::Order => "order",
            CreateStage::Payment => "payment",
            CreateStage::Items => "items",
        }
    }
}

impl std::fmt::Display for CreateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during the checkout workflow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout requires at least one cart line.
    #[error("Cart is empty")]
    EmptyCart,

    /// Guest sessions cannot place orders.
    #[error("Sign in to place an order")]
    AuthenticationRequired,

    /// Suspended accounts cannot place orders.
    #[error("Account is suspended")]
    AccountSuspended,

    /// The user already has an order in a non-terminal status.
    ///
    /// Not an exceptional failure: the expected recovery is navigating to
    /// the existing order's status view.
    #[error("An active order already exists: {order_id} ({status})")]
    ActiveOrderExists {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// One of the creation inserts failed after earlier ones succeeded.
    ///
    /// Rows created before the failing stage are left in place; there is
    /// no automatic rollback.
    #[error("Order partially created: {stage} insert failed: {source}")]
    Insert {
        stage: CreateStage,
        source: StoreError,
    },

    /// The gateway answered, but with malformed data.
    #[error("Gateway returned malformed data: {0}")]
    GatewayProtocol(String),

    /// The gateway could not be reached.
    #[error("Gateway unreachable: {0}")]
    GatewayTransport(String),

    /// The gateway rejected the request.
    #[error("Gateway rejected the request: {0}")]
    GatewayRejected(String),

    /// A cart aggregate operation was invalid.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// A store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(CreateStage::Order.to_string(), "order");
        assert_eq!(CreateStage::Payment.to_string(), "payment");
        assert_eq!(CreateStage::Items.to_string(), "items");
    }

    #[test]
    fn test_insert_error_names_the_stage() {
        let err = CheckoutError::Insert {
            stage: CreateStage::Payment,
            source: StoreError::Unavailable("connection dropped".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("payment"));
        assert!(message.contains("partially created"));
    }
}
