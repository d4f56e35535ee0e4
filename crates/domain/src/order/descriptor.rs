//! Order lines and the normalized order descriptor.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::payment::PaymentMethod;
use crate::value_objects::{Money, ProductId};

use super::OrderStatus;

/// Display prefix for human-readable order numbers.
const ORDER_NUMBER_PREFIX: &str = "ORD-";

/// How many trailing characters of the order id make up the order number.
const ORDER_NUMBER_SUFFIX_LEN: usize = 6;

/// Derives the human-readable order number from an order id.
///
/// Pure and deterministic: the same order id always yields the same
/// number, so it is stable across reloads and retries.
pub fn order_number(order_id: OrderId) -> String {
    let simple = order_id.as_uuid().simple().to_string();
    let suffix = &simple[simple.len() - ORDER_NUMBER_SUFFIX_LEN..];
    format!("{}{}", ORDER_NUMBER_PREFIX, suffix.to_uppercase())
}

/// An immutable line snapshot taken at order-creation time.
///
/// Later catalog price changes must not retroactively affect historical
/// orders, so the price and name are copied out of the cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product identifier.
    pub product_id: ProductId,

    /// Product name at order time.
    pub name: String,

    /// Price per unit at order time.
    pub unit_price: Money,

    /// Quantity ordered.
    pub quantity: u32,

    /// Reference to the product image, if any.
    pub image: Option<String>,
}

impl OrderLine {
    /// Snapshots a cart line into an order line.
    pub fn from_cart_line(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            image: line.image.clone(),
        }
    }

    /// Returns the subtotal for this line (unit_price * quantity).
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Sums line subtotals into an order total.
pub fn compute_total(lines: &[OrderLine]) -> Money {
    lines.iter().map(|l| l.subtotal()).sum()
}

/// Normalized descriptor of a persisted order.
///
/// This is the shape handed to the order-status view and across
/// serialization boundaries; prices are integer centavos so the total
/// survives JSON round-trips without loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDescriptor {
    /// The order identifier.
    pub order_id: OrderId,

    /// The user who placed the order.
    pub user_id: UserId,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// Current order status.
    pub status: OrderStatus,

    /// Immutable line snapshots.
    pub items: Vec<OrderLine>,

    /// Order total; always equals the sum of line subtotals.
    pub total: Money,

    /// How the order is being paid.
    pub payment_method: PaymentMethod,

    /// Human-readable order number derived from the order id.
    pub order_number: String,
}

impl OrderDescriptor {
    /// Builds a descriptor, computing the total and order number.
    pub fn new(
        order_id: OrderId,
        user_id: UserId,
        created_at: DateTime<Utc>,
        status: OrderStatus,
        payment_method: PaymentMethod,
        items: Vec<OrderLine>,
    ) -> Self {
        let total = compute_total(&items);
        Self {
            order_id,
            user_id,
            created_at,
            status,
            items,
            total,
            payment_method,
            order_number: order_number(order_id),
        }
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|l| l.quantity).sum()
    }
}
