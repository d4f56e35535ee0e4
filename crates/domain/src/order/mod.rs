//! Order types: status state machine, line snapshots, and the descriptor.

mod descriptor;
mod status;

pub use descriptor::{OrderDescriptor, OrderLine, compute_total, order_number};
pub use status::{OrderError, OrderStatus};
