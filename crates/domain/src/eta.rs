//! Preparation-time and ETA arithmetic.
//!
//! Two estimates live here:
//! - the kitchen prep estimate computed at order creation, from the
//!   longest line prep time plus a queue buffer;
//! - the countdown ETA shown on the status screen, from total item count
//!   and the order's position in the queue.
//!
//! Both are display estimates; the persisted order status stays the
//! authoritative source once the backend confirms it.

use chrono::{DateTime, Duration, Utc};

use crate::cart::CartLine;

/// Queue buffer added on top of the longest line prep time.
pub const QUEUE_BUFFER_MINUTES: i64 = 5;

/// Fallback prep estimate when no line carries a prep time.
pub const DEFAULT_PREP_MINUTES: i64 = 15;

/// Countdown minutes per ordered item.
pub const PER_ITEM_MINUTES: i64 = 5;

/// Countdown minutes per queue slot ahead of this order.
pub const PER_QUEUE_SLOT_MINUTES: i64 = 2;

/// Estimates preparation time for a cart snapshot.
///
/// `max(line prep time) + QUEUE_BUFFER_MINUTES`; an empty snapshot falls
/// back to [`DEFAULT_PREP_MINUTES`]. Checkout preconditions make the
/// empty case unreachable, but it must not panic.
pub fn estimate_prep_minutes<'a>(lines: impl IntoIterator<Item = &'a CartLine>) -> i64 {
    let mut longest: Option<i64> = None;
    for line in lines {
        let prep = line.prep_time_minutes.unwrap_or(0).max(0);
        longest = Some(longest.map_or(prep, |l| l.max(prep)));
    }
    match longest {
        Some(minutes) => minutes + QUEUE_BUFFER_MINUTES,
        None => DEFAULT_PREP_MINUTES,
    }
}

/// Countdown ETA in minutes for an order.
///
/// `total_quantity * PER_ITEM_MINUTES + (queue_position - 1) *
/// PER_QUEUE_SLOT_MINUTES`, where `queue_position` is 1-based.
pub fn eta_minutes(total_quantity: u32, queue_position: u32) -> i64 {
    let slots_ahead = queue_position.saturating_sub(1) as i64;
    total_quantity as i64 * PER_ITEM_MINUTES + slots_ahead * PER_QUEUE_SLOT_MINUTES
}

/// Returns the instant the order is estimated to be ready.
pub fn ready_at(created_at: DateTime<Utc>, eta_minutes: i64) -> DateTime<Utc> {
    created_at + Duration::minutes(eta_minutes)
}

/// Seconds remaining until `ready_at`, clamped at zero.
pub fn remaining_seconds(ready_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (ready_at - now).num_seconds().max(0)
}
