use common::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order row does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The referenced product does not exist in the catalog.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A persisted row could not be interpreted.
    #[error("Corrupt row in {entity}: {detail}")]
    CorruptRow {
        entity: &'static str,
        detail: String,
    },

    /// The store could not be reached.
    ///
    /// Used by the in-memory implementation to simulate transient
    /// transport failures in tests.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
