use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{Money, PaymentMethod};

/// Insert payload for a new order row.
///
/// The status column is assigned by the store and defaults to pending;
/// callers never set it at creation time.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The order identifier.
    pub order_id: OrderId,

    /// The user placing the order.
    pub user_id: UserId,

    /// How the order will be paid.
    pub payment_method: PaymentMethod,

    /// Order total computed from the cart snapshot.
    pub total: Money,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
