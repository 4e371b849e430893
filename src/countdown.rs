// src/countdown.rs
//! Display-only time-remaining breakdown for a scheduled start.
//!
//! Pure arithmetic, no I/O; the API layer computes it per request and the
//! UI ticks its own clock.

use serde::Serialize;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_DAY: u64 = 86_400;

/// Remaining time until a target instant, split for the banner widget.
/// All zeros once the target has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeLeft {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeLeft {
    pub const ZERO: TimeLeft = TimeLeft {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Breakdown of `target_unix - now_unix`, clamped at zero.
pub fn time_until(target_unix: u64, now_unix: u64) -> TimeLeft {
    let distance = target_unix.saturating_sub(now_unix);
    TimeLeft {
        days: distance / SECS_PER_DAY,
        hours: (distance % SECS_PER_DAY) / SECS_PER_HOUR,
        minutes: (distance % SECS_PER_HOUR) / SECS_PER_MINUTE,
        seconds: distance % SECS_PER_MINUTE,
    }
}
