//! Persistence seam for the ordering system.
//!
//! The external datastore exposes row-level query/insert/update operations
//! with upsert-by-conflict-key semantics; this crate captures that
//! contract as async traits and provides two implementations:
//! - [`InMemoryStore`] for tests and local development
//! - [`PostgresStore`] backed by sqlx
//!
//! No optimistic-concurrency token is used on any write; last-write-wins
//! is the policy, acceptable under the single-user-per-cart assumption.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CartStore, OrderStore, PaymentStore, ProductCatalog, Store};
pub use types::NewOrder;
