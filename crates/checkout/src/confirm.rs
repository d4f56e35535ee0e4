//! Applies terminal polling outcomes to payment and order rows.

use async_trait::async_trait;
use domain::{OrderStatus, PaymentSession, PaymentStatus};
use store::{OrderStore, PaymentStore};

use crate::polling::PollObserver;

/// Poll observer that records the observed payment outcome.
///
/// On success the payment moves to Succeeded and the order advances to
/// Preparing; failure and expiry mark the payment only, leaving the order
/// Pending for caller-driven recovery. A timeout changes nothing: the
/// loop gave up checking, which says nothing about the payment itself.
pub struct PaymentConfirmer<S> {
    store: S,
}

impl<S> PaymentConfirmer<S> {
    /// Creates a new confirmer.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: PaymentStore + OrderStore> PollObserver for PaymentConfirmer<S> {
    async fn on_success(&self, session: &PaymentSession) {
        if let Err(e) = self
            .store
            .update_payment_status(session.order_id, PaymentStatus::Succeeded)
            .await
        {
            tracing::error!(order_id = %session.order_id, error = %e, "failed to record payment success");
            return;
        }

        match self.store.order(session.order_id).await {
            Ok(Some(order)) => match order.status.transition_to(OrderStatus::Preparing) {
                Ok(next) => match self.store.update_order_status(session.order_id, next).await {
                    Ok(()) => {
                        metrics::counter!("payments_confirmed").increment(1);
                        tracing::info!(
                            order_id = %session.order_id,
                            "payment confirmed, order moved to preparing"
                        );
                    }
                    Err(e) => {
                        tracing::error!(order_id = %session.order_id, error = %e, "failed to advance order status");
                    }
                },
                Err(e) => {
                    tracing::debug!(order_id = %session.order_id, reason = %e, "order status left unchanged");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::error!(order_id = %session.order_id, error = %e, "failed to load order after payment success");
            }
        }
    }

    async fn on_failed(&self, session: &PaymentSession) {
        if let Err(e) = self
            .store
            .update_payment_status(session.order_id, PaymentStatus::Failed)
            .await
        {
            tracing::error!(order_id = %session.order_id, error = %e, "failed to record payment failure");
        }
        tracing::warn!(order_id = %session.order_id, "payment failed");
    }

    async fn on_expired(&self, session: &PaymentSession) {
        if let Err(e) = self
            .store
            .update_payment_status(session.order_id, PaymentStatus::Expired)
            .await
        {
            tracing::error!(order_id = %session.order_id, error = %e, "failed to record payment expiry");
        }
        tracing::warn!(order_id = %session.order_id, "payment session expired");
    }

    async fn on_timed_out(&self, attempts: u32) {
        tracing::warn!(attempts, "payment polling exhausted; payment left for reconciliation");
    }

    async fn on_error(&self, message: &str) {
        tracing::warn!(error = message, "payment polling errored");
    }
}
