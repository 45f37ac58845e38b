//! Time source for sampling and stamping.
//!
//! A session reads exactly one clock. The value read after a frame is acquired
//! drives the sampling gate and is also the timestamp written to the log.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Seconds, non-decreasing across calls.
    fn now(&mut self) -> f64;
}

/// Wall-clock seconds since the Unix epoch, captured once when the session
/// starts and then advanced by a monotonic timer, so system clock adjustments
/// mid-session cannot reorder samples.
#[derive(Debug, Clone)]
pub struct SessionClock {
    epoch_secs: f64,
    started: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        let epoch_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            epoch_secs,
            started: Instant::now(),
        }
    }
}

impl Clock for SessionClock {
    fn now(&mut self) -> f64 {
        self.epoch_secs + self.started.elapsed().as_secs_f64()
    }
}
