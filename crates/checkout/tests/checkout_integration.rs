//! End-to-end checkout workflow tests over the in-memory store.

use std::sync::Arc;

use checkout::{
    CartService, CheckoutError, DispatchOutcome, Identity, InMemoryGateway, NoopObserver,
    OrderCreationService, PaymentConfirmer, PaymentDispatcher, PollOutcome, PollState,
    PollingConfig, SessionPoller,
};
use common::UserId;
use domain::{
    Money, OrderStatus, PaymentMethod, PaymentStatus, Product, ProductId, SessionStatus,
};
use store::{InMemoryStore, OrderStore, PaymentStore};

struct Harness {
    store: InMemoryStore,
    gateway: InMemoryGateway,
    carts: CartService<InMemoryStore>,
    creation: OrderCreationService<InMemoryStore>,
    dispatcher: PaymentDispatcher<InMemoryStore>,
}

async fn harness() -> Harness {
    let store = InMemoryStore::new();
    store
        .add_product(Product::new(
            "burger-classic",
            "Classic Burger",
            Money::from_cents(12000),
            Some(10),
        ))
        .await;
    store
        .add_product(Product::new(
            "iced-tea",
            "Iced Tea",
            Money::from_cents(5000),
            None,
        ))
        .await;

    let gateway = InMemoryGateway::new(store.clone());
    Harness {
        carts: CartService::new(store.clone()),
        creation: OrderCreationService::new(store.clone()),
        dispatcher: PaymentDispatcher::new(store.clone(), Arc::new(gateway.clone())),
        gateway,
        store,
    }
}

#[tokio::test]
async fn cash_checkout_confirms_without_polling() {
    let h = harness().await;
    let user_id = UserId::new();
    let identity = Identity::customer(user_id);

    let mut cart = h.carts.load_for_user(user_id).await.unwrap();
    h.carts
        .add_item(&mut cart, &ProductId::new("burger-classic"), 2)
        .await
        .unwrap();

    let created = h
        .creation
        .create_order(&mut cart, PaymentMethod::Cash, &identity)
        .await
        .unwrap();
    assert_eq!(created.order.total.cents(), 24000);

    let payment = h.store.payment(created.order.order_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);

    let outcome = h.dispatcher.dispatch(&created.order).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Confirmed);

    // No gateway call, no session, no polling read.
    assert_eq!(h.gateway.request_count(), 0);
    assert_eq!(h.store.session_read_count().await, 0);
    assert!(cart.cart.is_empty());
}

#[tokio::test(start_paused = true)]
async fn gateway_checkout_success_after_three_ticks() {
    let h = harness().await;
    let user_id = UserId::new();
    let identity = Identity::customer(user_id);

    let mut cart = h.carts.load_for_user(user_id).await.unwrap();
    h.carts
        .add_item(&mut cart, &ProductId::new("iced-tea"), 10)
        .await
        .unwrap();

    let created = h
        .creation
        .create_order(&mut cart, PaymentMethod::GatewayRedirect, &identity)
        .await
        .unwrap();
    assert_eq!(created.order.total.cents(), 50000);

    let DispatchOutcome::Redirect { session_id, .. } =
        h.dispatcher.dispatch(&created.order).await.unwrap()
    else {
        panic!("expected redirect outcome");
    };

    let poller = SessionPoller::new(h.store.clone(), PollingConfig::default());
    let confirmer = Arc::new(PaymentConfirmer::new(h.store.clone()));
    poller.start(session_id.clone(), confirmer).await.unwrap();

    // Two pending checks land, then the webhook side flips the session.
    let mut snapshots = poller.subscribe();
    while snapshots.borrow().attempts < 2 {
        snapshots.changed().await.unwrap();
    }
    h.store
        .set_session_status(&session_id, SessionStatus::Success)
        .await;

    let outcome = poller.outcome().await.unwrap();
    let PollOutcome::Succeeded(session) = outcome else {
        panic!("expected success outcome");
    };
    assert_eq!(session.amount.cents(), 50000);

    // pending, pending, success: three reads and not a fourth.
    assert_eq!(h.store.session_read_count().await, 3);

    let payment = h.store.payment(created.order.order_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Succeeded);
    assert_eq!(
        payment.provider_intent_id.as_deref(),
        Some(session_id.as_str())
    );

    let order = h.store.order(created.order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Preparing);
}

#[tokio::test(start_paused = true)]
async fn gateway_checkout_times_out_when_session_never_resolves() {
    let h = harness().await;
    let user_id = UserId::new();
    let identity = Identity::customer(user_id);

    let mut cart = h.carts.load_for_user(user_id).await.unwrap();
    h.carts
        .add_item(&mut cart, &ProductId::new("burger-classic"), 1)
        .await
        .unwrap();

    let created = h
        .creation
        .create_order(&mut cart, PaymentMethod::GatewayRedirect, &identity)
        .await
        .unwrap();
    let DispatchOutcome::Redirect { session_id, .. } =
        h.dispatcher.dispatch(&created.order).await.unwrap()
    else {
        panic!("expected redirect outcome");
    };

    let poller = SessionPoller::new(h.store.clone(), PollingConfig::default());
    poller
        .start(session_id, Arc::new(NoopObserver))
        .await
        .unwrap();

    // The session stays pending for the whole budget: exhaustion reports
    // TimedOut, not Expired.
    let outcome = poller.outcome().await.unwrap();
    assert!(matches!(outcome, PollOutcome::TimedOut { attempts: 60 }));
    assert_eq!(poller.snapshot().state, PollState::TimedOut);
    assert_eq!(h.store.session_read_count().await, 60);

    // The payment stays processing for manual reconciliation.
    let payment = h.store.payment(created.order.order_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Processing);
    let order = h.store.order(created.order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn active_order_blocks_second_checkout() {
    let h = harness().await;
    let user_id = UserId::new();
    let identity = Identity::customer(user_id);

    let mut cart = h.carts.load_for_user(user_id).await.unwrap();
    h.carts
        .add_item(&mut cart, &ProductId::new("burger-classic"), 1)
        .await
        .unwrap();
    let created = h
        .creation
        .create_order(&mut cart, PaymentMethod::Cash, &identity)
        .await
        .unwrap();
    h.store
        .update_order_status(created.order.order_id, OrderStatus::Preparing)
        .await
        .unwrap();

    let mut second = h.carts.load_for_user(user_id).await.unwrap();
    h.carts
        .add_item(&mut second, &ProductId::new("iced-tea"), 1)
        .await
        .unwrap();

    let result = h
        .creation
        .create_order(&mut second, PaymentMethod::Cash, &identity)
        .await;
    assert!(matches!(
        result,
        Err(CheckoutError::ActiveOrderExists { order_id, status })
            if order_id == created.order.order_id && status == OrderStatus::Preparing
    ));
    assert_eq!(h.store.order_count().await, 1);
    assert_eq!(h.store.payment_count().await, 1);
}

#[tokio::test]
async fn order_total_is_immune_to_later_price_changes() {
    let h = harness().await;
    let user_id = UserId::new();
    let identity = Identity::customer(user_id);

    let mut cart = h.carts.load_for_user(user_id).await.unwrap();
    h.carts
        .add_item(&mut cart, &ProductId::new("burger-classic"), 2)
        .await
        .unwrap();

    let created = h
        .creation
        .create_order(&mut cart, PaymentMethod::Cash, &identity)
        .await
        .unwrap();

    // The menu price doubles after checkout.
    h.store
        .add_product(Product::new(
            "burger-classic",
            "Classic Burger",
            Money::from_cents(24000),
            Some(10),
        ))
        .await;

    let stored = h.store.order(created.order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.total.cents(), 24000);
    assert_eq!(stored.items[0].unit_price.cents(), 12000);
    assert_eq!(
        domain::compute_total(&stored.items),
        created.order.total
    );
}

#[tokio::test]
async fn gateway_transport_failure_leaves_order_recoverable() {
    let h = harness().await;
    let user_id = UserId::new();
    let identity = Identity::customer(user_id);

    let mut cart = h.carts.load_for_user(user_id).await.unwrap();
    h.carts
        .add_item(&mut cart, &ProductId::new("iced-tea"), 2)
        .await
        .unwrap();

    let created = h
        .creation
        .create_order(&mut cart, PaymentMethod::GatewayRedirect, &identity)
        .await
        .unwrap();

    h.gateway.set_fail_transport(true);
    let result = h.dispatcher.dispatch(&created.order).await;
    assert!(matches!(result, Err(CheckoutError::GatewayTransport(_))));

    // Order and payment stay pending; dispatch can be retried.
    let order = h.store.order(created.order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    let payment = h.store.payment(created.order.order_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);

    h.gateway.set_fail_transport(false);
    let outcome = h.dispatcher.dispatch(&created.order).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Redirect { .. }));
}

#[tokio::test]
async fn decrease_never_drops_below_one_through_the_service() {
    let h = harness().await;
    let user_id = UserId::new();

    let mut cart = h.carts.load_for_user(user_id).await.unwrap();
    let tea = ProductId::new("iced-tea");
    h.carts.add_item(&mut cart, &tea, 1).await.unwrap();

    for _ in 0..5 {
        assert_eq!(h.carts.decrease_qty(&mut cart, &tea).await.unwrap(), 1);
    }
    assert_eq!(cart.cart.quantity(&tea), Some(1));
    assert_eq!(
        h.store.cart_line_quantity(cart.cart_id, &tea).await,
        Some(1)
    );
}
