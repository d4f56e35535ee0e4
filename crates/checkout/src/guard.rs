//! Active-order guard.

use common::UserId;
use domain::OrderDescriptor;
use store::OrderStore;

use crate::error::CheckoutError;

/// Rejects new-order creation while a prior order is still in flight.
///
/// Advisory at this level: it checks at dispatch time, not atomically
/// with the insert, so a second device can race past it. The store's
/// active-order uniqueness constraint is the backstop.
pub struct ActiveOrderGuard<S> {
    store: S,
}

impl<S: OrderStore> ActiveOrderGuard<S> {
    /// Creates a new guard.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's newest non-terminal order, if any.
    ///
    /// This is what the caller navigates to when creation is refused.
    #[tracing::instrument(skip(self))]
    pub async fn active_order(
        &self,
        user_id: UserId,
    ) -> Result<Option<OrderDescriptor>, CheckoutError> {
        Ok(self.store.latest_active_order(user_id).await?)
    }

    /// Fails with [`CheckoutError::ActiveOrderExists`] if the user has an
    /// order in a non-terminal status.
    #[tracing::instrument(skip(self))]
    pub async fn check(&self, user_id: UserId) -> Result<(), CheckoutError> {
        match self.store.latest_active_order(user_id).await? {
            Some(existing) => {
                tracing::info!(
                    order_id = %existing.order_id,
                    status = %existing.status,
                    "new order refused, active order exists"
                );
                Err(CheckoutError::ActiveOrderExists {
                    order_id: existing.order_id,
                    status: existing.status,
                })
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::OrderId;
    use domain::{Money, OrderStatus, PaymentMethod};
    use store::{InMemoryStore, NewOrder, OrderStore as _};

    fn new_order(user_id: UserId) -> NewOrder {
        NewOrder {
            order_id: OrderId::new(),
            user_id,
            payment_method: PaymentMethod::Cash,
            total: Money::from_cents(1000),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_check_passes_with_no_orders() {
        let store = InMemoryStore::new();
        let guard = ActiveOrderGuard::new(store);
        guard.check(UserId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_rejects_active_order() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        let order = new_order(user_id);
        store.insert_order(&order).await.unwrap();
        store
            .update_order_status(order.order_id, OrderStatus::Preparing)
            .await
            .unwrap();

        let guard = ActiveOrderGuard::new(store);
        let result = guard.check(user_id).await;
        assert!(matches!(
            result,
            Err(CheckoutError::ActiveOrderExists { order_id, status })
                if order_id == order.order_id && status == OrderStatus::Preparing
        ));

        let active = guard.active_order(user_id).await.unwrap().unwrap();
        assert_eq!(active.order_id, order.order_id);
    }

    #[tokio::test]
    async fn test_check_passes_after_terminal_status() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        let order = new_order(user_id);
        store.insert_order(&order).await.unwrap();
        store
            .update_order_status(order.order_id, OrderStatus::Completed)
            .await
            .unwrap();

        let guard = ActiveOrderGuard::new(store);
        guard.check(user_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_ignores_other_users() {
        let store = InMemoryStore::new();
        store.insert_order(&new_order(UserId::new())).await.unwrap();

        let guard = ActiveOrderGuard::new(store);
        guard.check(UserId::new()).await.unwrap();
    }
}
