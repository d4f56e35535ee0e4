//! Payment-session polling loop.
//!
//! A cancellable async task that re-reads a payment session on a fixed
//! interval until it resolves or the attempt budget runs out. The two
//! contracts that matter: no check fires after cancellation, and a
//! terminal state stops all future checks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{PaymentSession, PaymentSessionId, SessionStatus};
use store::PaymentStore;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Timing parameters for the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Delay between status checks.
    pub interval: Duration,

    /// Checks issued before giving up.
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    /// 2 seconds between checks, 60 checks: about two minutes of wall time.
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: 60,
        }
    }
}

/// State of the polling loop.
///
/// `Idle -> Polling -> {Succeeded, Failed, Expired, TimedOut, Errored}`.
/// TimedOut means the loop gave up checking; it says nothing about
/// whether the payment itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    /// Not polling.
    #[default]
    Idle,

    /// Checks are being issued.
    Polling,

    /// The session resolved to success.
    Succeeded,

    /// The session resolved to failed.
    Failed,

    /// The session resolved to expired.
    Expired,

    /// The attempt budget ran out while the session stayed pending.
    TimedOut,

    /// The session could not be read (definitively absent).
    Errored,
}

impl PollState {
    /// Returns true if the loop has finished.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Idle | PollState::Polling)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PollState::Idle => "Idle",
            PollState::Polling => "Polling",
            PollState::Succeeded => "Succeeded",
            PollState::Failed => "Failed",
            PollState::Expired => "Expired",
            PollState::TimedOut => "TimedOut",
            PollState::Errored => "Errored",
        }
    }
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable snapshot of the polling loop.
#[derive(Debug, Clone, Default)]
pub struct PollSnapshot {
    /// Current state.
    pub state: PollState,

    /// Checks issued so far in this run.
    pub attempts: u32,

    /// Most recent transient read failure, if any.
    pub last_error: Option<String>,
}

/// Terminal result of a polling run.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The session resolved to success.
    Succeeded(PaymentSession),

    /// The session resolved to failed.
    Failed(PaymentSession),

    /// The session resolved to expired.
    Expired(PaymentSession),

    /// The attempt budget ran out; distinct from Failed and Expired.
    TimedOut { attempts: u32 },

    /// The session row is definitively absent.
    SessionNotFound(PaymentSessionId),

    /// The loop was cancelled before resolving.
    Cancelled,
}

impl PollOutcome {
    /// Returns the state this outcome leaves the loop in.
    pub fn state(&self) -> PollState {
        match self {
            PollOutcome::Succeeded(_) => PollState::Succeeded,
            PollOutcome::Failed(_) => PollState::Failed,
            PollOutcome::Expired(_) => PollState::Expired,
            PollOutcome::TimedOut { .. } => PollState::TimedOut,
            PollOutcome::SessionNotFound(_) => PollState::Errored,
            PollOutcome::Cancelled => PollState::Idle,
        }
    }
}

/// Terminal callbacks raised by the polling loop.
///
/// Each terminal state gets its own callback so callers can offer
/// different remediation (retry payment vs. re-create the order).
#[async_trait]
pub trait PollObserver: Send + Sync {
    /// The session resolved to success.
    async fn on_success(&self, session: &PaymentSession) {
        let _ = session;
    }

    /// The session resolved to failed.
    async fn on_failed(&self, session: &PaymentSession) {
        let _ = session;
    }

    /// The session resolved to expired.
    async fn on_expired(&self, session: &PaymentSession) {
        let _ = session;
    }

    /// The loop gave up after `attempts` checks.
    async fn on_timed_out(&self, attempts: u32) {
        let _ = attempts;
    }

    /// The session could not be found.
    async fn on_error(&self, message: &str) {
        let _ = message;
    }
}

/// Observer that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl PollObserver for NoopObserver {}

/// Errors from driving the poller.
#[derive(Debug, Error)]
pub enum PollError {
    /// A polling run is already in flight.
    #[error("A polling run is already in flight")]
    AlreadyPolling,
}

struct ActivePoll {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<PollOutcome>,
}

/// Polls a payment session until it resolves, times out, or is cancelled.
pub struct SessionPoller<S> {
    store: S,
    config: PollingConfig,
    snapshot_tx: watch::Sender<PollSnapshot>,
    active: Mutex<Option<ActivePoll>>,
}

impl<S: PaymentStore + Clone + 'static> SessionPoller<S> {
    /// Creates an idle poller.
    pub fn new(store: S, config: PollingConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(PollSnapshot::default());
        Self {
            store,
            config,
            snapshot_tx,
            active: Mutex::new(None),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> PollSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Starts polling a session: attempts reset to zero, an immediate
    /// first check, then one check per interval.
    pub async fn start(
        &self,
        session_id: PaymentSessionId,
        observer: Arc<dyn PollObserver>,
    ) -> Result<(), PollError> {
        let mut active = self.active.lock().await;
        if let Some(poll) = active.as_ref()
            && !poll.task.is_finished()
        {
            return Err(PollError::AlreadyPolling);
        }

        self.snapshot_tx.send_replace(PollSnapshot {
            state: PollState::Polling,
            attempts: 0,
            last_error: None,
        });

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(
            self.store.clone(),
            session_id,
            self.config,
            observer,
            self.snapshot_tx.clone(),
            stop_rx,
        ));
        *active = Some(ActivePoll { stop_tx, task });
        Ok(())
    }

    /// Awaits the current run's terminal outcome.
    ///
    /// Returns None when no run is in flight.
    pub async fn outcome(&self) -> Option<PollOutcome> {
        let poll = self.active.lock().await.take()?;
        match poll.task.await {
            Ok(outcome) => Some(outcome),
            Err(_) => Some(PollOutcome::Cancelled),
        }
    }

    /// Stops the loop. When this returns, no further check will fire.
    pub async fn cancel(&self) -> bool {
        let Some(poll) = self.active.lock().await.take() else {
            return false;
        };
        let _ = poll.stop_tx.send(true);
        let _ = poll.task.await;
        true
    }

    /// Clears status, error, and attempts back to Idle.
    ///
    /// Idempotent, and never starts polling by itself.
    pub async fn reset(&self) {
        self.cancel().await;
        self.snapshot_tx.send_replace(PollSnapshot::default());
    }
}

async fn run_loop<S: PaymentStore>(
    store: S,
    session_id: PaymentSessionId,
    config: PollingConfig,
    observer: Arc<dyn PollObserver>,
    snapshot_tx: watch::Sender<PollSnapshot>,
    mut stop_rx: watch::Receiver<bool>,
) -> PollOutcome {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts: u32 = 0;

    let outcome = loop {
        tokio::select! {
            _ = stop_rx.changed() => break PollOutcome::Cancelled,
            _ = ticker.tick() => {
                if *stop_rx.borrow() {
                    break PollOutcome::Cancelled;
                }
                match store.payment_session(&session_id).await {
                    Ok(Some(session)) => match session.status {
                        SessionStatus::Success => {
                            observer.on_success(&session).await;
                            break PollOutcome::Succeeded(session);
                        }
                        SessionStatus::Failed => {
                            observer.on_failed(&session).await;
                            break PollOutcome::Failed(session);
                        }
                        SessionStatus::Expired => {
                            observer.on_expired(&session).await;
                            break PollOutcome::Expired(session);
                        }
                        SessionStatus::Pending => {
                            attempts += 1;
                            if attempts >= config.max_attempts {
                                observer.on_timed_out(attempts).await;
                                break PollOutcome::TimedOut { attempts };
                            }
                            snapshot_tx.send_modify(|s| s.attempts = attempts);
                        }
                    },
                    Ok(None) => {
                        observer.on_error("payment session not found").await;
                        break PollOutcome::SessionNotFound(session_id.clone());
                    }
                    Err(e) => {
                        // A transient read failure does not abort the loop,
                        // but it still consumes an attempt so the loop
                        // always terminates within the budget.
                        attempts += 1;
                        let message = e.to_string();
                        tracing::warn!(%session_id, error = %message, "payment session read failed");
                        if attempts >= config.max_attempts {
                            observer.on_timed_out(attempts).await;
                            break PollOutcome::TimedOut { attempts };
                        }
                        snapshot_tx.send_modify(|s| {
                            s.attempts = attempts;
                            s.last_error = Some(message);
                        });
                    }
                }
            }
        }
    };

    let final_state = outcome.state();
    snapshot_tx.send_modify(|s| {
        s.state = final_state;
        s.attempts = attempts;
    });

    match &outcome {
        PollOutcome::Succeeded(_) => metrics::counter!("payment_polls_succeeded").increment(1),
        PollOutcome::Failed(_) | PollOutcome::Expired(_) => {
            metrics::counter!("payment_polls_failed").increment(1);
        }
        PollOutcome::TimedOut { .. } => metrics::counter!("payment_polls_timed_out").increment(1),
        PollOutcome::SessionNotFound(_) => {
            metrics::counter!("payment_polls_errored").increment(1);
        }
        PollOutcome::Cancelled => {}
    }
    tracing::info!(%session_id, state = %final_state, attempts, "payment polling finished");

    outcome
}
