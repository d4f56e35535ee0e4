//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{
    Money, OrderStatus, PaymentMethod, PaymentRecord, PaymentSessionId, PaymentStatus, Product,
    ProductId, SessionStatus,
};
use sqlx::PgPool;
use store::{
    CartStore, NewOrder, OrderStore, PaymentStore, PostgresStore, ProductCatalog, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_ordering_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query(
        "TRUNCATE TABLE cart_items, carts, order_items, payment_sessions, payments, orders, products CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

async fn seed_products(store: &PostgresStore) {
    store
        .upsert_product(&Product::new(
            "burger-classic",
            "Classic Burger",
            Money::from_cents(12000),
            Some(10),
        ))
        .await
        .unwrap();
    store
        .upsert_product(&Product::new(
            "fries-large",
            "Large Fries",
            Money::from_cents(6000),
            Some(6),
        ))
        .await
        .unwrap();
}

fn new_order(user_id: UserId, cents: i64) -> NewOrder {
    NewOrder {
        order_id: OrderId::new(),
        user_id,
        payment_method: PaymentMethod::Cash,
        total: Money::from_cents(cents),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn ensure_cart_upserts_without_duplicates() {
    let store = get_test_store().await;
    let user_id = UserId::new();

    let first = store.ensure_cart(user_id).await.unwrap();
    let second = store.ensure_cart(user_id).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn cart_lines_hydrate_from_catalog() {
    let store = get_test_store().await;
    seed_products(&store).await;

    let cart_id = store.ensure_cart(UserId::new()).await.unwrap();
    store
        .upsert_cart_line(cart_id, &ProductId::new("burger-classic"), 2)
        .await
        .unwrap();

    // Price changes after the line was written; hydration re-reads it.
    store
        .upsert_product(&Product::new(
            "burger-classic",
            "Classic Burger",
            Money::from_cents(15000),
            Some(10),
        ))
        .await
        .unwrap();

    let lines = store.cart_lines(cart_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].unit_price.cents(), 15000);
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(lines[0].prep_time_minutes, Some(10));
}

#[tokio::test]
async fn upsert_cart_line_rejects_unknown_product() {
    let store = get_test_store().await;
    let cart_id = store.ensure_cart(UserId::new()).await.unwrap();

    let result = store
        .upsert_cart_line(cart_id, &ProductId::new("ghost"), 1)
        .await;
    assert!(matches!(result, Err(StoreError::UnknownProduct(_))));
}

#[tokio::test]
async fn order_insert_defaults_to_pending() {
    let store = get_test_store().await;
    let order = new_order(UserId::new(), 24000);

    store.insert_order(&order).await.unwrap();

    let loaded = store.order(order.order_id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Pending);
    assert_eq!(loaded.total.cents(), 24000);
    assert_eq!(loaded.payment_method, PaymentMethod::Cash);
}

#[tokio::test]
async fn active_order_unique_index_rejects_second_active_order() {
    let store = get_test_store().await;
    let user_id = UserId::new();

    store.insert_order(&new_order(user_id, 1000)).await.unwrap();

    let result = store.insert_order(&new_order(user_id, 2000)).await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn latest_active_order_ignores_terminal_orders() {
    let store = get_test_store().await;
    let user_id = UserId::new();

    let first = new_order(user_id, 1000);
    store.insert_order(&first).await.unwrap();
    store
        .update_order_status(first.order_id, OrderStatus::Completed)
        .await
        .unwrap();

    let second = new_order(user_id, 2000);
    store.insert_order(&second).await.unwrap();

    let active = store.latest_active_order(user_id).await.unwrap().unwrap();
    assert_eq!(active.order_id, second.order_id);

    store
        .update_order_status(second.order_id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert!(store.latest_active_order(user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn order_lines_roundtrip() {
    let store = get_test_store().await;
    seed_products(&store).await;
    let order = new_order(UserId::new(), 30000);
    store.insert_order(&order).await.unwrap();

    let lines = vec![
        domain::OrderLine {
            product_id: ProductId::new("burger-classic"),
            name: "Classic Burger".to_string(),
            unit_price: Money::from_cents(12000),
            quantity: 2,
            image: None,
        },
        domain::OrderLine {
            product_id: ProductId::new("fries-large"),
            name: "Large Fries".to_string(),
            unit_price: Money::from_cents(6000),
            quantity: 1,
            image: Some("fries.png".to_string()),
        },
    ];
    store
        .insert_order_lines(order.order_id, &lines)
        .await
        .unwrap();

    let loaded = store.order(order.order_id).await.unwrap().unwrap();
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].product_id, ProductId::new("burger-classic"));
    assert_eq!(loaded.items[0].quantity, 2);
    assert_eq!(loaded.items[1].image.as_deref(), Some("fries.png"));
}

#[tokio::test]
async fn queue_position_counts_active_orders_ahead() {
    let store = get_test_store().await;

    let first = new_order(UserId::new(), 1000);
    store.insert_order(&first).await.unwrap();

    let mut second = new_order(UserId::new(), 2000);
    second.created_at = first.created_at + chrono::Duration::seconds(3);
    store.insert_order(&second).await.unwrap();

    assert_eq!(store.queue_position(first.order_id).await.unwrap(), 1);
    assert_eq!(store.queue_position(second.order_id).await.unwrap(), 2);
}

#[tokio::test]
async fn payment_lifecycle_roundtrip() {
    let store = get_test_store().await;
    let order = new_order(UserId::new(), 50000);
    store.insert_order(&order).await.unwrap();

    let record = PaymentRecord::pending(
        order.order_id,
        order.user_id,
        PaymentMethod::GatewayRedirect,
        order.total,
    );
    store.insert_payment(&record).await.unwrap();

    let loaded = store.payment(order.order_id).await.unwrap().unwrap();
    assert_eq!(loaded.status, PaymentStatus::Pending);
    assert_eq!(loaded.provider.as_deref(), Some("paymongo"));

    store
        .mark_payment_processing(order.order_id, "paymongo", "cs_live_0001")
        .await
        .unwrap();

    let loaded = store.payment(order.order_id).await.unwrap().unwrap();
    assert_eq!(loaded.status, PaymentStatus::Processing);
    assert_eq!(loaded.provider_intent_id.as_deref(), Some("cs_live_0001"));

    store
        .update_payment_status(order.order_id, PaymentStatus::Succeeded)
        .await
        .unwrap();
    let loaded = store.payment(order.order_id).await.unwrap().unwrap();
    assert_eq!(loaded.status, PaymentStatus::Succeeded);
}

#[tokio::test]
async fn payment_session_read() {
    let store = get_test_store().await;
    let order = new_order(UserId::new(), 50000);
    store.insert_order(&order).await.unwrap();

    sqlx::query(
        r#"
        INSERT INTO payment_sessions (id, order_id, status, amount_cents, method)
        VALUES ($1, $2, 'pending', $3, 'paymongo')
        "#,
    )
    .bind("cs_live_0002")
    .bind(order.order_id.as_uuid())
    .bind(50000i64)
    .execute(store.pool())
    .await
    .unwrap();

    let session = store
        .payment_session(&PaymentSessionId::new("cs_live_0002"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Pending);
    assert_eq!(session.amount.cents(), 50000);
    assert_eq!(session.order_id, order.order_id);

    let missing = store
        .payment_session(&PaymentSessionId::new("cs_missing"))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn product_catalog_read() {
    let store = get_test_store().await;
    seed_products(&store).await;

    let product = store
        .product(&ProductId::new("burger-classic"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.unit_price.cents(), 12000);

    let missing = store.product(&ProductId::new("ghost")).await.unwrap();
    assert!(missing.is_none());
}
