//! Order creation service.

use chrono::Utc;
use common::OrderId;
use domain::{OrderDescriptor, OrderLine, OrderStatus, PaymentMethod, PaymentRecord, eta};
use store::{NewOrder, Store};

use crate::cart_service::HydratedCart;
use crate::error::{CheckoutError, CreateStage};
use crate::guard::ActiveOrderGuard;
use crate::identity::Identity;

/// Result of a successful order creation.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    /// The normalized order descriptor.
    pub order: OrderDescriptor,

    /// Kitchen prep estimate computed from the cart snapshot.
    pub estimated_prep_minutes: i64,
}

/// Creates persisted orders from a cart snapshot.
///
/// The insert sequence is fixed (order -> payment -> items -> cart clear)
/// because payment and item rows reference the order id. The sequence is
/// at-least-once and non-transactional: a failure aborts it, tags the
/// failing stage, and leaves earlier rows in place without rollback.
pub struct OrderCreationService<S> {
    store: S,
    guard: ActiveOrderGuard<S>,
}

impl<S: Store + Clone> OrderCreationService<S> {
    /// Creates a new order creation service.
    pub fn new(store: S) -> Self {
        let guard = ActiveOrderGuard::new(store.clone());
        Self { store, guard }
    }

    /// Creates an order from the hydrated cart.
    ///
    /// Preconditions: an authenticated, unsuspended identity; a non-empty
    /// cart; no active order for the user. The cart (persisted and
    /// in-memory) is cleared only when all three inserts succeed.
    #[tracing::instrument(skip(self, hydrated, identity), fields(method = %method))]
    pub async fn create_order(
        &self,
        hydrated: &mut HydratedCart,
        method: PaymentMethod,
        identity: &Identity,
    ) -> Result<CreatedOrder, CheckoutError> {
        metrics::counter!("checkout_attempts").increment(1);
        let start = std::time::Instant::now();

        let user_id = identity.require_active_customer()?;
        if hydrated.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        self.guard.check(user_id).await?;

        let lines: Vec<OrderLine> = hydrated.cart.lines().map(OrderLine::from_cart_line).collect();
        let total = hydrated.cart.total();
        let estimated_prep_minutes = eta::estimate_prep_minutes(hydrated.cart.lines());
        let order_id = OrderId::new();
        let created_at = Utc::now();

        let new_order = NewOrder {
            order_id,
            user_id,
            payment_method: method,
            total,
            created_at,
        };
        self.store
            .insert_order(&new_order)
            .await
            .map_err(|source| CheckoutError::Insert {
                stage: CreateStage::Order,
                source,
            })?;

        let payment = PaymentRecord::pending(order_id, user_id, method, total);
        self.store
            .insert_payment(&payment)
            .await
            .map_err(|source| CheckoutError::Insert {
                stage: CreateStage::Payment,
                source,
            })?;

        self.store
            .insert_order_lines(order_id, &lines)
            .await
            .map_err(|source| CheckoutError::Insert {
                stage: CreateStage::Items,
                source,
            })?;

        // All inserts succeeded. A failed remote clear leaves a stale
        // persisted cart for eventual cleanup, not a failed order.
        if let Err(e) = self.store.clear_cart(hydrated.cart_id).await {
            tracing::warn!(%order_id, error = %e, "persisted cart clear failed after order creation");
        }
        hydrated.cart.clear();

        metrics::counter!("orders_placed").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::info!(%order_id, total = %total, estimated_prep_minutes, "order created");

        Ok(CreatedOrder {
            order: OrderDescriptor::new(
                order_id,
                user_id,
                created_at,
                OrderStatus::Pending,
                method,
                lines,
            ),
            estimated_prep_minutes,
        })
    }
}
