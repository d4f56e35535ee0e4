use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId, UserId};
use domain::{
    CartLine, Money, OrderDescriptor, OrderLine, OrderStatus, PaymentMethod, PaymentRecord,
    PaymentSession, PaymentSessionId, PaymentStatus, Product, ProductId, SessionStatus,
    order_number,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CartStore, OrderStore, PaymentStore, ProductCatalog},
    types::NewOrder,
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts or replaces a product in the catalog (seeding/ops helper).
    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, unit_price_cents, image, prep_time_minutes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                unit_price_cents = EXCLUDED.unit_price_cents,
                image = EXCLUDED.image,
                prep_time_minutes = EXCLUDED.prep_time_minutes
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.unit_price.cents())
        .bind(&product.image)
        .bind(product.prep_time_minutes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn parse_order_status(code: &str) -> Result<OrderStatus> {
        OrderStatus::from_code(code).ok_or_else(|| StoreError::CorruptRow {
            entity: "orders",
            detail: format!("unknown status '{code}'"),
        })
    }

    fn parse_method(code: &str) -> Result<PaymentMethod> {
        PaymentMethod::from_code(code).ok_or_else(|| StoreError::CorruptRow {
            entity: "orders",
            detail: format!("unknown payment method '{code}'"),
        })
    }

    fn row_to_order_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            quantity: row.try_get::<i64, _>("quantity")? as u32,
            image: row.try_get("image")?,
        })
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, name, unit_price_cents, quantity, image
            FROM order_items
            WHERE order_id = $1
            ORDER BY product_id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order_line).collect()
    }

    async fn row_to_descriptor(&self, row: PgRow) -> Result<OrderDescriptor> {
        let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let lines = self.order_lines(order_id).await?;

        Ok(OrderDescriptor {
            order_id,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            status: Self::parse_order_status(row.try_get::<String, _>("status")?.as_str())?,
            items: lines,
            total: Money::from_cents(row.try_get("total_cents")?),
            payment_method: Self::parse_method(
                row.try_get::<String, _>("payment_method")?.as_str(),
            )?,
            order_number: order_number(order_id),
        })
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn ensure_cart(&self, user_id: UserId) -> Result<CartId> {
        // Upsert-by-conflict-key: create-if-absent, never a duplicate row.
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            "#,
        )
        .bind(CartId::new().as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(CartId::from_uuid(id))
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.product_id, ci.quantity, p.name, p.unit_price_cents, p.image,
                   p.prep_time_minutes
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.product_id ASC
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CartLine {
                    product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
                    name: row.try_get("name")?,
                    unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                    quantity: row.try_get::<i64, _>("quantity")? as u32,
                    prep_time_minutes: row.try_get("prep_time_minutes")?,
                    image: row.try_get("image")?,
                })
            })
            .collect()
    }

    async fn upsert_cart_line(
        &self,
        cart_id: CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(cart_id.as_uuid())
        .bind(product_id.as_str())
        .bind(quantity as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("cart_items_product_id_fkey")
            {
                return StoreError::UnknownProduct(product_id.to_string());
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn delete_cart_line(&self, cart_id: CartId, product_id: &ProductId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id.as_uuid())
            .bind(product_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for PostgresStore {
    async fn product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, unit_price_cents, image, prep_time_minutes FROM products WHERE id = $1",
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Product {
                id: ProductId::new(row.try_get::<String, _>("id")?),
                name: row.try_get("name")?,
                unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                image: row.try_get("image")?,
                prep_time_minutes: row.try_get("prep_time_minutes")?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<()> {
        // Status is left to the column default so it stays server-assigned.
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, payment_method, total_cents, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.order_id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.payment_method.code())
        .bind(order.total.cents())
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("one_active_order_per_user")
            {
                return StoreError::Conflict("user already has an active order".to_string());
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn insert_order_lines(&self, order_id: OrderId, lines: &[OrderLine]) -> Result<()> {
        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, name, unit_price_cents, quantity, image)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(line.product_id.as_str())
            .bind(&line.name)
            .bind(line.unit_price.cents())
            .bind(line.quantity as i64)
            .bind(&line.image)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn order(&self, order_id: OrderId) -> Result<Option<OrderDescriptor>> {
        let row = sqlx::query(
            "SELECT id, user_id, status, payment_method, total_cents, created_at FROM orders WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_descriptor(row).await?)),
            None => Ok(None),
        }
    }

    async fn latest_active_order(&self, user_id: UserId) -> Result<Option<OrderDescriptor>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, payment_method, total_cents, created_at
            FROM orders
            WHERE user_id = $1 AND status IN ('pending', 'preparing', 'ready')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_descriptor(row).await?)),
            None => Ok(None),
        }
    }

    async fn update_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(status.code())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }
        Ok(())
    }

    async fn queue_position(&self, order_id: OrderId) -> Result<u32> {
        let created_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT created_at FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        let created_at = created_at.ok_or(StoreError::OrderNotFound(order_id))?;

        let ahead: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM orders
            WHERE status IN ('pending', 'preparing', 'ready') AND created_at < $1
            "#,
        )
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(ahead as u32 + 1)
    }
}

#[async_trait]
impl PaymentStore for PostgresStore {
    async fn insert_payment(&self, payment: &PaymentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (order_id, user_id, method, amount_cents, status, provider, provider_intent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(payment.order_id.as_uuid())
        .bind(payment.user_id.as_uuid())
        .bind(payment.method.code())
        .bind(payment.amount.cents())
        .bind(payment.status.code())
        .bind(&payment.provider)
        .bind(&payment.provider_intent_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_payment_processing(
        &self,
        order_id: OrderId,
        provider: &str,
        intent_id: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'processing', provider = $2, provider_intent_id = $3
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(provider)
        .bind(intent_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }
        Ok(())
    }

    async fn update_payment_status(&self, order_id: OrderId, status: PaymentStatus) -> Result<()> {
        let result = sqlx::query("UPDATE payments SET status = $2 WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .bind(status.code())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }
        Ok(())
    }

    async fn payment(&self, order_id: OrderId) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, user_id, method, amount_cents, status, provider, provider_intent_id
            FROM payments
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let status_code: String = row.try_get("status")?;
                let method_code: String = row.try_get("method")?;
                Ok(Some(PaymentRecord {
                    order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                    user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                    method: Self::parse_method(&method_code)?,
                    amount: Money::from_cents(row.try_get("amount_cents")?),
                    status: PaymentStatus::from_code(&status_code).ok_or_else(|| {
                        StoreError::CorruptRow {
                            entity: "payments",
                            detail: format!("unknown status '{status_code}'"),
                        }
                    })?,
                    provider: row.try_get("provider")?,
                    provider_intent_id: row.try_get("provider_intent_id")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn payment_session(
        &self,
        session_id: &PaymentSessionId,
    ) -> Result<Option<PaymentSession>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, status, amount_cents, method, created_at, updated_at
            FROM payment_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let status_code: String = row.try_get("status")?;
                let method_code: String = row.try_get("method")?;
                Ok(Some(PaymentSession {
                    session_id: PaymentSessionId::new(row.try_get::<String, _>("id")?),
                    order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                    status: SessionStatus::from_code(&status_code).ok_or_else(|| {
                        StoreError::CorruptRow {
                            entity: "payment_sessions",
                            detail: format!("unknown status '{status_code}'"),
                        }
                    })?,
                    amount: Money::from_cents(row.try_get("amount_cents")?),
                    method: Self::parse_method(&method_code)?,
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                }))
            }
            None => Ok(None),
        }
    }
}
