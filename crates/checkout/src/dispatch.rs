//! Payment dispatch: cash short-circuit or gateway hand-off.

use std::sync::Arc;

use domain::{OrderDescriptor, PaymentMethod, PaymentSessionId};
use store::PaymentStore;

use crate::error::CheckoutError;
use crate::gateway::{GatewayError, GatewayRequest, PaymentGateway};

/// How a dispatched payment proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Payment accepted on the spot; nothing external to wait for.
    Confirmed,

    /// Hand-off to the hosted checkout page; poll the session to learn
    /// the outcome. Opening the URL is the caller's fire-and-forget side
    /// effect.
    Redirect {
        redirect_url: String,
        session_id: PaymentSessionId,
    },
}

/// Branches a created order's payment on its method.
///
/// On any failure the order and payment rows stay Pending; recovery
/// (retry, or manual reconciliation) is the caller's call.
pub struct PaymentDispatcher<S> {
    store: S,
    gateway: Arc<dyn PaymentGateway>,
}

impl<S: PaymentStore> PaymentDispatcher<S> {
    /// Creates a new dispatcher.
    pub fn new(store: S, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Dispatches payment for an order.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.order_id, method = %order.payment_method))]
    pub async fn dispatch(&self, order: &OrderDescriptor) -> Result<DispatchOutcome, CheckoutError> {
        match order.payment_method {
            PaymentMethod::Cash => {
                metrics::counter!("payments_dispatched_cash").increment(1);
                tracing::info!("cash payment confirmed at checkout");
                Ok(DispatchOutcome::Confirmed)
            }
            PaymentMethod::GatewayRedirect => {
                let request = GatewayRequest {
                    amount: order.total.cents(),
                    payment_method_type: order.payment_method.code().to_string(),
                    order_id: order.order_id.to_string(),
                    user_id: order.user_id.to_string(),
                };

                let response =
                    self.gateway
                        .create_session(&request)
                        .await
                        .map_err(|e| match e {
                            GatewayError::Transport(message) => {
                                CheckoutError::GatewayTransport(message)
                            }
                            GatewayError::Upstream { status, message } => {
                                CheckoutError::GatewayRejected(format!("{status}: {message}"))
                            }
                        })?;

                // A 2xx answer without both hand-off fields is a protocol
                // error, reported distinctly from transport failures.
                let redirect_url = response
                    .redirect_url
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| {
                        CheckoutError::GatewayProtocol("response missing redirect_url".to_string())
                    })?;
                let session_id = response
                    .payment_session_id
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        CheckoutError::GatewayProtocol(
                            "response missing payment_session_id".to_string(),
                        )
                    })?;

                let provider = order.payment_method.provider().unwrap_or("gateway");
                self.store
                    .mark_payment_processing(order.order_id, provider, &session_id)
                    .await?;

                metrics::counter!("payments_dispatched_gateway").increment(1);
                tracing::info!(%session_id, "gateway session created");

                Ok(DispatchOutcome::Redirect {
                    redirect_url,
                    session_id: PaymentSessionId::new(session_id),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{OrderId, UserId};
    use domain::{Money, OrderLine, OrderStatus, PaymentRecord, PaymentStatus, ProductId};
    use store::{InMemoryStore, NewOrder, OrderStore as _, PaymentStore as _};

    use crate::gateway::InMemoryGateway;

    async fn order_with_payment(store: &InMemoryStore, method: PaymentMethod) -> OrderDescriptor {
        let order_id = OrderId::new();
        let user_id = UserId::new();
        let items = vec![OrderLine {
            product_id: ProductId::new("burger"),
            name: "Classic Burger".to_string(),
            unit_price: Money::from_cents(25000),
            quantity: 2,
            image: None,
        }];
        let descriptor = OrderDescriptor::new(
            order_id,
            user_id,
            Utc::now(),
            OrderStatus::Pending,
            method,
            items,
        );

        store
            .insert_order(&NewOrder {
                order_id,
                user_id,
                payment_method: method,
                total: descriptor.total,
                created_at: descriptor.created_at,
            })
            .await
            .unwrap();
        store
            .insert_payment(&PaymentRecord::pending(
                order_id,
                user_id,
                method,
                descriptor.total,
            ))
            .await
            .unwrap();

        descriptor
    }

    #[tokio::test]
    async fn test_cash_confirms_without_gateway_call() {
        let store = InMemoryStore::new();
        let gateway = InMemoryGateway::new(store.clone());
        let dispatcher = PaymentDispatcher::new(store.clone(), Arc::new(gateway.clone()));
        let order = order_with_payment(&store, PaymentMethod::Cash).await;

        let outcome = dispatcher.dispatch(&order).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Confirmed);
        assert_eq!(gateway.request_count(), 0);

        // The payment row stays pending for cash.
        let payment = store.payment(order.order_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_gateway_redirect_marks_payment_processing() {
        let store = InMemoryStore::new();
        let gateway = InMemoryGateway::new(store.clone());
        let dispatcher = PaymentDispatcher::new(store.clone(), Arc::new(gateway.clone()));
        let order = order_with_payment(&store, PaymentMethod::GatewayRedirect).await;

        let outcome = dispatcher.dispatch(&order).await.unwrap();

        let DispatchOutcome::Redirect {
            redirect_url,
            session_id,
        } = outcome
        else {
            panic!("expected redirect outcome");
        };
        assert!(redirect_url.contains(session_id.as_str()));

        let request = gateway.last_request().unwrap();
        assert_eq!(request.amount, 50000);
        assert_eq!(request.payment_method_type, "paymongo");
        assert_eq!(request.order_id, order.order_id.to_string());

        let payment = store.payment(order.order_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Processing);
        assert_eq!(payment.provider_intent_id.as_deref(), Some(session_id.as_str()));
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_payment_pending() {
        let store = InMemoryStore::new();
        let gateway = InMemoryGateway::new(store.clone());
        gateway.set_fail_transport(true);
        let dispatcher = PaymentDispatcher::new(store.clone(), Arc::new(gateway));
        let order = order_with_payment(&store, PaymentMethod::GatewayRedirect).await;

        let result = dispatcher.dispatch(&order).await;

        assert!(matches!(result, Err(CheckoutError::GatewayTransport(_))));
        let payment = store.payment(order.order_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_session_id_is_a_protocol_error() {
        let store = InMemoryStore::new();
        let gateway = InMemoryGateway::new(store.clone());
        gateway.set_omit_session_id(true);
        let dispatcher = PaymentDispatcher::new(store.clone(), Arc::new(gateway));
        let order = order_with_payment(&store, PaymentMethod::GatewayRedirect).await;

        let result = dispatcher.dispatch(&order).await;

        // Malformed gateway data, not a transport failure.
        assert!(matches!(result, Err(CheckoutError::GatewayProtocol(_))));
        let payment = store.payment(order.order_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }
}
