//! Domain layer for the ordering system.
//!
//! This crate provides the pure domain model:
//! - Cart aggregate with quantity rules
//! - Order status state machine and immutable order-line snapshots
//! - Payment method, status, and session types
//! - Preparation-time and ETA arithmetic
//!
//! Nothing in this crate performs I/O; persistence and workflow live in
//! the `store` and `checkout` crates.

pub mod cart;
pub mod catalog;
pub mod eta;
pub mod order;
pub mod payment;
pub mod value_objects;

pub use cart::{Cart, CartError, CartLine};
pub use catalog::Product;
pub use order::{OrderDescriptor, OrderError, OrderLine, OrderStatus, compute_total, order_number};
pub use payment::{
    PaymentMethod, PaymentRecord, PaymentSession, PaymentSessionId, PaymentStatus, SessionStatus,
};
pub use value_objects::{Money, ProductId};
