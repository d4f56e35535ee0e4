//! Order countdown tracking.
//!
//! A 1 Hz ticker that counts down to the estimated ready time and flips a
//! display state to Ready at zero. This is a display estimate only: the
//! persisted order status is authoritative whenever it has something to
//! say.

use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::{OrderStatus, eta};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// One countdown sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountdownTick {
    /// Seconds until the estimated ready time, clamped at zero.
    pub remaining_seconds: i64,

    /// True once the countdown elapsed.
    pub ready: bool,
}

/// Handle to a running countdown task.
pub struct CountdownHandle {
    rx: watch::Receiver<CountdownTick>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    /// Returns the latest sample.
    pub fn latest(&self) -> CountdownTick {
        *self.rx.borrow()
    }

    /// Subscribes to countdown samples.
    pub fn subscribe(&self) -> watch::Receiver<CountdownTick> {
        self.rx.clone()
    }

    /// Stops the ticker. When this returns, no further sample will be
    /// published.
    pub async fn cancel(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }

    /// Waits until the countdown reaches Ready.
    pub async fn completed(mut self) -> CountdownTick {
        while !self.rx.borrow().ready {
            if self.rx.changed().await.is_err() {
                break;
            }
        }
        *self.rx.borrow()
    }
}

/// Spawns a countdown toward `ready_at`, sampled once per second.
///
/// The remaining time is captured against the wall clock once at spawn
/// and counted down on the runtime clock, so the ticker is testable with
/// a paused runtime and cheap at steady state.
pub fn spawn_countdown(ready_at: DateTime<Utc>) -> CountdownHandle {
    let initial = eta::remaining_seconds(ready_at, Utc::now());
    let deadline = Instant::now() + Duration::from_secs(initial.max(0) as u64);

    let (tx, rx) = watch::channel(CountdownTick {
        remaining_seconds: initial,
        ready: initial == 0,
    });
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        if initial == 0 {
            return;
        }
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately and matches the sample
        // published at spawn.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = stop_rx.changed() => break,
                now = ticker.tick() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                    let remaining = deadline.saturating_duration_since(now).as_secs() as i64;
                    let ready = remaining == 0;
                    let _ = tx.send(CountdownTick {
                        remaining_seconds: remaining,
                        ready,
                    });
                    if ready {
                        // Ready is terminal for the ticker.
                        break;
                    }
                }
            }
        }
    });

    CountdownHandle { rx, stop_tx, task }
}

/// Resolves the status shown to the user.
///
/// The backend status wins whenever it is past the countdown phase; while
/// the order is still Pending/Preparing, an elapsed countdown shows
/// Ready.
pub fn display_status(backend: OrderStatus, remaining_seconds: i64) -> OrderStatus {
    if remaining_seconds == 0
        && matches!(backend, OrderStatus::Pending | OrderStatus::Preparing)
    {
        OrderStatus::Ready
    } else {
        backend
    }
}
