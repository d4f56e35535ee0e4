//! Shared identifier types used across the ordering system.

pub mod types;

pub use types::{CartId, OrderId, UserId};
