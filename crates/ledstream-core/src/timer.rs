use std::time::{Duration, Instant};

use crate::protocols::wled::Timeout;

/// Interval used for timeout byte 0 and between repeated blanks.
pub const DEFAULT_BLANK_INTERVAL: Duration = Duration::from_millis(1000);

/// Instant at which the strip is forced to black unless a newer frame
/// arrives first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankDeadline {
    At(Instant),
    Never,
}

impl BlankDeadline {
    /// Recompute the deadline from scratch for an accepted frame.
    pub fn arm(now: Instant, timeout: Timeout) -> Self {
        match timeout {
            Timeout::Never => BlankDeadline::Never,
            Timeout::Default => BlankDeadline::At(now + DEFAULT_BLANK_INTERVAL),
            Timeout::Seconds(seconds) => {
                BlankDeadline::At(now + Duration::from_secs(u64::from(seconds)))
            }
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self {
            BlankDeadline::At(at) => now >= *at,
            BlankDeadline::Never => false,
        }
    }
}
