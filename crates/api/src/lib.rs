//! HTTP API server for the ordering system.
//!
//! Exposes the checkout workflow over REST with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use checkout::{
    ActiveOrderGuard, CartService, InMemoryGateway, OrderCreationService, PaymentDispatcher,
    PaymentGateway, PollingConfig,
};
use domain::{Money, Product};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, Store};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::orders::checkout::<S>))
        .route("/orders/active", get(routes::orders::active::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/eta", get(routes::orders::order_eta::<S>))
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{product_id}",
            delete(routes::cart::remove_item::<S>),
        )
        .route("/payments/sessions/{id}", get(routes::payments::session::<S>))
        .route("/payments/return", get(routes::payments::checkout_return))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds application state over any store and gateway.
pub fn build_state<S: Store + Clone + 'static>(
    store: S,
    gateway: Arc<dyn PaymentGateway>,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        carts: CartService::new(store.clone()),
        creation: OrderCreationService::new(store.clone()),
        dispatcher: PaymentDispatcher::new(store.clone(), gateway),
        guard: ActiveOrderGuard::new(store.clone()),
        store,
        polling: PollingConfig::default(),
    })
}

/// Creates in-memory application state with the in-memory gateway.
pub fn create_default_state(store: InMemoryStore) -> Arc<AppState<InMemoryStore>> {
    let gateway = Arc::new(InMemoryGateway::new(store.clone()));
    build_state(store, gateway)
}

/// Seeds a small demo menu for local runs without a database.
pub async fn seed_demo_menu(store: &InMemoryStore) {
    for product in [
        Product::new("burger-classic", "Classic Burger", Money::from_cents(12000), Some(10))
            .with_image("burgers/classic.png"),
        Product::new("burger-double", "Double Burger", Money::from_cents(18500), Some(14))
            .with_image("burgers/double.png"),
        Product::new("fries-large", "Large Fries", Money::from_cents(6000), Some(6))
            .with_image("sides/fries.png"),
        Product::new("iced-tea", "Iced Tea", Money::from_cents(4500), None)
            .with_image("drinks/iced-tea.png"),
    ] {
        store.add_product(product).await;
    }
}
