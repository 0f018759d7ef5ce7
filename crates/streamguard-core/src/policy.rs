//! Failure escalation policy.
//!
//! The host runtime calls [`FailureHandler::on_failure`] from the thread whose
//! record callback failed and blocks until an action comes back. The decision
//! takes one lock, does no I/O, and never panics or propagates the failure it was
//! told about: anything unexpected on the decision path resolves to
//! [`RecoveryAction::ShutdownApplication`].

use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, warn};

use crate::action::RecoveryAction;
use crate::clock::{Clock, SystemClock};
use crate::config::EscalationConfig;
use crate::tracker::FailureWindowTracker;

/// Capability a host runtime registers to be told about processing failures.
pub trait FailureHandler: Send + Sync {
    fn on_failure(&self, cause: &dyn Error) -> RecoveryAction;
}

impl<F> FailureHandler for F
where
    F: Fn(&dyn Error) -> RecoveryAction + Send + Sync,
{
    fn on_failure(&self, cause: &dyn Error) -> RecoveryAction {
        self(cause)
    }
}

/// Lifetime counters, for observability only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyStats {
    pub failures_seen: u64,
    pub restarts: u64,
    pub escalations: u64,
}

/// Restarts the failing thread until `max_failures` land inside one window of
/// `max_time_interval_ms`, then shuts the application down.
///
/// Never returns [`RecoveryAction::ShutdownWorker`].
pub struct EscalationPolicy {
    cfg: EscalationConfig,
    tracker: Mutex<FailureWindowTracker>,
    clock: Arc<dyn Clock>,
    failures_seen: AtomicU64,
    restarts: AtomicU64,
    escalations: AtomicU64,
}

impl std::fmt::Debug for EscalationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationPolicy")
            .field("cfg", &self.cfg)
            .field("stats", &self.stats())
            .finish()
    }
}

impl EscalationPolicy {
    pub fn new(cfg: EscalationConfig) -> Self {
        Self::with_clock(cfg, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(cfg: EscalationConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cfg,
            tracker: Mutex::new(FailureWindowTracker::new(cfg.max_time_interval_ms())),
            clock,
            failures_seen: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            escalations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.cfg
    }

    /// Decide for a failure that happened at `now_ms`.
    pub fn on_failure_at(&self, cause: &dyn Error, now_ms: i64) -> RecoveryAction {
        self.decide(cause, Some(now_ms))
    }

    /// Failures currently inside the window ending at `now_ms`.
    ///
    /// Returns `None` if the tracker lock is poisoned.
    pub fn failures_in_window_at(&self, now_ms: i64) -> Option<usize> {
        let mut tracker = self.tracker.lock().ok()?;
        Some(tracker.count_in_window(now_ms))
    }

    pub fn stats(&self) -> PolicyStats {
        PolicyStats {
            failures_seen: self.failures_seen.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
        }
    }

    fn decide(&self, cause: &dyn Error, at_ms: Option<i64>) -> RecoveryAction {
        self.failures_seen.fetch_add(1, Ordering::Relaxed);

        match panic::catch_unwind(AssertUnwindSafe(|| self.evaluate(cause, at_ms))) {
            Ok(action) => action,
            Err(_) => {
                error!("panic while evaluating a reported failure; escalating");
                self.escalate()
            }
        }
    }

    // Counters are bumped only after logging, so a panic here never counts twice.
    fn evaluate(&self, cause: &dyn Error, at_ms: Option<i64>) -> RecoveryAction {
        // formatted before the lock: a faulty Display must not poison the tracker
        let cause = cause.to_string();
        let Some((now_ms, count)) = self.record_and_count(at_ms) else {
            error!("failure tracker lock poisoned while handling '{}'; escalating", cause);
            return self.escalate();
        };

        let max = self.cfg.max_failures() as usize;
        if count < max {
            debug!(
                "failure {}/{} within {}ms at t={}: {}; restarting thread",
                count,
                max,
                self.cfg.max_time_interval_ms(),
                now_ms,
                cause
            );
            self.restarts.fetch_add(1, Ordering::Relaxed);
            RecoveryAction::RestartThread
        } else {
            warn!(
                "failure {}/{} within {}ms at t={}: {}; shutting down application",
                count,
                max,
                self.cfg.max_time_interval_ms(),
                now_ms,
                cause
            );
            self.escalate()
        }
    }

    // Clock is read under the lock so concurrent callers record in order.
    fn record_and_count(&self, at_ms: Option<i64>) -> Option<(i64, usize)> {
        let mut tracker = self.tracker.lock().ok()?;
        let now_ms = at_ms.unwrap_or_else(|| self.clock.now_ms());
        tracker.record_failure(now_ms);
        Some((now_ms, tracker.count_in_window(now_ms)))
    }

    fn escalate(&self) -> RecoveryAction {
        self.escalations.fetch_add(1, Ordering::Relaxed);
        RecoveryAction::ShutdownApplication
    }
}

impl FailureHandler for EscalationPolicy {
    fn on_failure(&self, cause: &dyn Error) -> RecoveryAction {
        self.decide(cause, None)
    }
}
