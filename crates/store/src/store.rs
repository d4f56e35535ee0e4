use async_trait::async_trait;
use common::{CartId, OrderId, UserId};
use domain::{
    CartLine, OrderDescriptor, OrderLine, OrderStatus, PaymentRecord, PaymentSession,
    PaymentSessionId, PaymentStatus, Product, ProductId,
};

use crate::{Result, types::NewOrder};

/// Persisted-cart operations, scoped by user.
///
/// A user owns at most one cart row; `ensure_cart` has upsert semantics
/// (create-if-absent, never a duplicate).
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the user's cart id, creating the cart row if absent.
    async fn ensure_cart(&self, user_id: UserId) -> Result<CartId>;

    /// Hydrates cart lines by joining cart items with the product catalog.
    ///
    /// Prices, names, and prep times come from the catalog at call time,
    /// never from a client-cached copy.
    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>>;

    /// Inserts or replaces the quantity for a product in a cart.
    async fn upsert_cart_line(
        &self,
        cart_id: CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<()>;

    /// Deletes the row for a product in a cart.
    async fn delete_cart_line(&self, cart_id: CartId, product_id: &ProductId) -> Result<()>;

    /// Deletes every item row in a cart.
    async fn clear_cart(&self, cart_id: CartId) -> Result<()>;
}

/// Read access to product catalog metadata.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns the product with the given id, if it exists.
    async fn product(&self, product_id: &ProductId) -> Result<Option<Product>>;
}

/// Order row and order-line operations.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order row with the store-assigned default status.
    async fn insert_order(&self, order: &NewOrder) -> Result<()>;

    /// Inserts the immutable line snapshots for an order.
    async fn insert_order_lines(&self, order_id: OrderId, lines: &[OrderLine]) -> Result<()>;

    /// Loads an order descriptor by id.
    async fn order(&self, order_id: OrderId) -> Result<Option<OrderDescriptor>>;

    /// Returns the user's most recent order in a non-terminal status.
    ///
    /// Newest first, limited to one: the active-order query contract.
    async fn latest_active_order(&self, user_id: UserId) -> Result<Option<OrderDescriptor>>;

    /// Updates an order's status.
    async fn update_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()>;

    /// Returns the order's 1-based position among active orders, by
    /// creation time.
    async fn queue_position(&self, order_id: OrderId) -> Result<u32>;
}

/// Payment row and payment-session operations.
///
/// Sessions are read-only from this side; the gateway/webhook side owns
/// their status.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts the payment row created alongside an order.
    async fn insert_payment(&self, payment: &PaymentRecord) -> Result<()>;

    /// Marks a payment as processing once a gateway session exists.
    async fn mark_payment_processing(
        &self,
        order_id: OrderId,
        provider: &str,
        intent_id: &str,
    ) -> Result<()>;

    /// Updates a payment's status.
    async fn update_payment_status(&self, order_id: OrderId, status: PaymentStatus) -> Result<()>;

    /// Loads the payment row for an order.
    async fn payment(&self, order_id: OrderId) -> Result<Option<PaymentRecord>>;

    /// Reads a payment session by its gateway-assigned id.
    async fn payment_session(
        &self,
        session_id: &PaymentSessionId,
    ) -> Result<Option<PaymentSession>>;
}

/// Convenience bound for components that need the whole store surface.
pub trait Store: CartStore + OrderStore + PaymentStore + ProductCatalog {}

impl<T> Store for T where T: CartStore + OrderStore + PaymentStore + ProductCatalog {}
