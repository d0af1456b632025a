//! Write-timestamp sources

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Write instant in microseconds
pub type Timestamp = i64;

/// Source of write timestamps, read only by the writer thread
pub trait Clock: Send + 'static {
    /// Current instant
    fn now(&self) -> Timestamp;
}

/// Wall clock (microseconds since the Unix epoch)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp_micros()
    }
}

/// Settable clock shared between a test and the writer.
///
/// Cloning yields a handle to the same instant, so a test can keep one clone
/// and move the other into the cache.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    /// Jump to an arbitrary instant, including backwards
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `delta`
    pub fn advance(&self, delta: Timestamp) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
