use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, OrderId, UserId};
use domain::{
    CartLine, OrderDescriptor, OrderLine, OrderStatus, PaymentRecord, PaymentSession,
    PaymentSessionId, PaymentStatus, Product, ProductId, order_number,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{CartStore, OrderStore, PaymentStore, ProductCatalog},
    types::NewOrder,
};

#[derive(Debug, Clone)]
struct OrderRow {
    order: NewOrder,
    status: OrderStatus,
}

#[derive(Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, CartId>,
    cart_items: HashMap<CartId, HashMap<ProductId, u32>>,
    orders: HashMap<OrderId, OrderRow>,
    order_lines: HashMap<OrderId, Vec<OrderLine>>,
    payments: HashMap<OrderId, PaymentRecord>,
    sessions: HashMap<PaymentSessionId, PaymentSession>,

    // Test instrumentation
    session_reads: u64,
    failing_session_reads: u32,
    fail_on_insert_order: bool,
    fail_on_insert_payment: bool,
    fail_on_insert_lines: bool,
    fail_on_clear_cart: bool,
    fail_on_delete_line: bool,
}

/// In-memory store implementation for tests and local development.
///
/// Provides the same interface as the PostgreSQL implementation, plus
/// seeding helpers, failure injection for specific write steps, and a
/// read counter for the payment-session spy assertions.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product in the catalog.
    pub async fn add_product(&self, product: Product) {
        self.state
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Inserts a payment session, as the gateway/webhook side would.
    pub async fn put_session(&self, session: PaymentSession) {
        self.state
            .write()
            .await
            .sessions
            .insert(session.session_id.clone(), session);
    }

    /// Flips a payment session's status, as the webhook side would.
    pub async fn set_session_status(&self, session_id: &PaymentSessionId, status: domain::SessionStatus) {
        let mut state = self.state.write().await;
        if let Some(session) = state.sessions.get_mut(session_id) {
            session.status = status;
            session.updated_at = Utc::now();
        }
    }

    /// Returns how many payment-session reads have been issued.
    pub async fn session_read_count(&self) -> u64 {
        self.state.read().await.session_reads
    }

    /// Makes the next `n` payment-session reads fail transiently.
    pub async fn fail_next_session_reads(&self, n: u32) {
        self.state.write().await.failing_session_reads = n;
    }

    /// Configures order-insert failure injection.
    pub async fn set_fail_on_insert_order(&self, fail: bool) {
        self.state.write().await.fail_on_insert_order = fail;
    }

    /// Configures payment-insert failure injection.
    pub async fn set_fail_on_insert_payment(&self, fail: bool) {
        self.state.write().await.fail_on_insert_payment = fail;
    }

    /// Configures order-line-insert failure injection.
    pub async fn set_fail_on_insert_lines(&self, fail: bool) {
        self.state.write().await.fail_on_insert_lines = fail;
    }

    /// Configures cart-clear failure injection.
    pub async fn set_fail_on_clear_cart(&self, fail: bool) {
        self.state.write().await.fail_on_clear_cart = fail;
    }

    /// Configures cart-line-delete failure injection.
    pub async fn set_fail_on_delete_line(&self, fail: bool) {
        self.state.write().await.fail_on_delete_line = fail;
    }

    /// Returns the number of order rows.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of payment rows.
    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }

    /// Returns the number of line rows for an order.
    pub async fn order_line_count(&self, order_id: OrderId) -> usize {
        self.state
            .read()
            .await
            .order_lines
            .get(&order_id)
            .map_or(0, Vec::len)
    }

    /// Returns the persisted quantity for a cart line, if present.
    pub async fn cart_line_quantity(&self, cart_id: CartId, product_id: &ProductId) -> Option<u32> {
        self.state
            .read()
            .await
            .cart_items
            .get(&cart_id)
            .and_then(|items| items.get(product_id))
            .copied()
    }

    fn descriptor(row: &OrderRow, lines: Vec<OrderLine>) -> OrderDescriptor {
        OrderDescriptor {
            order_id: row.order.order_id,
            user_id: row.order.user_id,
            created_at: row.order.created_at,
            status: row.status,
            items: lines,
            total: row.order.total,
            payment_method: row.order.payment_method,
            order_number: order_number(row.order.order_id),
        }
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn ensure_cart(&self, user_id: UserId) -> Result<CartId> {
        let mut state = self.state.write().await;
        if let Some(cart_id) = state.carts.get(&user_id) {
            return Ok(*cart_id);
        }
        let cart_id = CartId::new();
        state.carts.insert(user_id, cart_id);
        state.cart_items.insert(cart_id, HashMap::new());
        Ok(cart_id)
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let state = self.state.read().await;
        let Some(items) = state.cart_items.get(&cart_id) else {
            return Ok(vec![]);
        };

        let mut lines = Vec::with_capacity(items.len());
        for (product_id, quantity) in items {
            match state.products.get(product_id) {
                Some(product) => lines.push(product.cart_line(*quantity)),
                None => {
                    // Item was delisted from the menu after it was carted.
                    tracing::warn!(%product_id, "dropping cart line for unknown product");
                }
            }
        }
        Ok(lines)
    }

    async fn upsert_cart_line(
        &self,
        cart_id: CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(product_id) {
            return Err(StoreError::UnknownProduct(product_id.to_string()));
        }
        state
            .cart_items
            .entry(cart_id)
            .or_default()
            .insert(product_id.clone(), quantity);
        Ok(())
    }

    async fn delete_cart_line(&self, cart_id: CartId, product_id: &ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_delete_line {
            return Err(StoreError::Unavailable(
                "injected delete failure".to_string(),
            ));
        }
        if let Some(items) = state.cart_items.get_mut(&cart_id) {
            items.remove(product_id);
        }
        Ok(())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_clear_cart {
            return Err(StoreError::Unavailable("injected clear failure".to_string()));
        }
        if let Some(items) = state.cart_items.get_mut(&cart_id) {
            items.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(product_id).cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_insert_order {
            return Err(StoreError::Unavailable(
                "injected order insert failure".to_string(),
            ));
        }
        state.orders.insert(
            order.order_id,
            OrderRow {
                order: order.clone(),
                status: OrderStatus::Pending,
            },
        );
        Ok(())
    }

    async fn insert_order_lines(&self, order_id: OrderId, lines: &[OrderLine]) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_insert_lines {
            return Err(StoreError::Unavailable(
                "injected line insert failure".to_string(),
            ));
        }
        state.order_lines.insert(order_id, lines.to_vec());
        Ok(())
    }

    async fn order(&self, order_id: OrderId) -> Result<Option<OrderDescriptor>> {
        let state = self.state.read().await;
        let Some(row) = state.orders.get(&order_id) else {
            return Ok(None);
        };
        let lines = state.order_lines.get(&order_id).cloned().unwrap_or_default();
        Ok(Some(Self::descriptor(row, lines)))
    }

    async fn latest_active_order(&self, user_id: UserId) -> Result<Option<OrderDescriptor>> {
        let state = self.state.read().await;
        let newest = state
            .orders
            .values()
            .filter(|row| row.order.user_id == user_id && row.status.is_active())
            .max_by_key(|row| row.order.created_at);

        Ok(newest.map(|row| {
            let lines = state
                .order_lines
                .get(&row.order.order_id)
                .cloned()
                .unwrap_or_default();
            Self::descriptor(row, lines)
        }))
    }

    async fn update_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let row = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        row.status = status;
        Ok(())
    }

    async fn queue_position(&self, order_id: OrderId) -> Result<u32> {
        let state = self.state.read().await;
        let row = state
            .orders
            .get(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        let ahead = state
            .orders
            .values()
            .filter(|other| {
                other.status.is_active() && other.order.created_at < row.order.created_at
            })
            .count() as u32;
        Ok(ahead + 1)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(&self, payment: &PaymentRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_insert_payment {
            return Err(StoreError::Unavailable(
                "injected payment insert failure".to_string(),
            ));
        }
        state.payments.insert(payment.order_id, payment.clone());
        Ok(())
    }

    async fn mark_payment_processing(
        &self,
        order_id: OrderId,
        provider: &str,
        intent_id: &str,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let payment = state
            .payments
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        payment.status = PaymentStatus::Processing;
        payment.provider = Some(provider.to_string());
        payment.provider_intent_id = Some(intent_id.to_string());
        Ok(())
    }

    async fn update_payment_status(&self, order_id: OrderId, status: PaymentStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let payment = state
            .payments
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        payment.status = status;
        Ok(())
    }

    async fn payment(&self, order_id: OrderId) -> Result<Option<PaymentRecord>> {
        Ok(self.state.read().await.payments.get(&order_id).cloned())
    }

    async fn payment_session(
        &self,
        session_id: &PaymentSessionId,
    ) -> Result<Option<PaymentSession>> {
        let mut state = self.state.write().await;
        state.session_reads += 1;
        if state.failing_session_reads > 0 {
            state.failing_session_reads -= 1;
            return Err(StoreError::Unavailable(
                "injected session read failure".to_string(),
            ));
        }
        Ok(state.sessions.get(session_id).cloned())
    }
}
