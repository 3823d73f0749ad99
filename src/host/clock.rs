//! Time source for the device model, plus the polling-rate meter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::POLLING_RATE_WINDOW_MS;

/// Monotonic milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall clock, counted from construction.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for deterministic tests. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Counts input reports and publishes reports-per-second once per window.
#[derive(Clone, Debug, Default)]
pub struct PollingRateMeter {
    window_start: Option<u64>,
    count: u64,
    rate: u32,
}

impl PollingRateMeter {
    pub fn record(&mut self, reports: usize, now_ms: u64) {
        let start = *self.window_start.get_or_insert(now_ms);
        self.count += reports as u64;

        let elapsed = now_ms.saturating_sub(start);
        if elapsed >= POLLING_RATE_WINDOW_MS {
            self.rate = (self.count * 1000 / elapsed) as u32;
            self.count = 0;
            self.window_start = Some(now_ms);
        }
    }

    /// Last published rate in Hz, 0 until a full window has elapsed.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
