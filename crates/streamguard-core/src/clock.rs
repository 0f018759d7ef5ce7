use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Millisecond time source for failure timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// UTC epoch millis sampled once at construction, then advanced by a monotonic
/// [`Instant`], so readings never step backwards when the wall clock is adjusted.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin_ms: i64,
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin_ms: chrono::Utc::now().timestamp_millis(), anchor: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.anchor.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.origin_ms.saturating_add(elapsed)
    }
}

/// Clock that only moves when told to. Used by tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self { now_ms: AtomicI64::new(start_ms) }
    }

    pub fn set(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
