//! Delay policy for pre-request jitter and pre-retry backoff.
//!
//! The fetcher never calls `rand` directly for timing; it asks a
//! [`WaitPolicy`] so tests can swap in [`NoWait`].

use crate::config::DelayRange;
use rand::{rng, Rng};
use std::fmt::Debug;
use std::time::Duration;

/// Turns a configured delay range into a concrete sleep duration.
pub trait WaitPolicy: Debug + Send + Sync {
    fn delay(&self, range: DelayRange) -> Duration;
}

/// Uniformly random duration inside the range.
#[derive(Debug, Default, Clone, Copy)]
pub struct JitterWait;

impl WaitPolicy for JitterWait {
    fn delay(&self, range: DelayRange) -> Duration {
        let min = range.min_duration();
        let max = range.max_duration();
        if max <= min {
            return min;
        }
        let secs = rng().random_range(min.as_secs_f64()..=max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Always zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWait;

impl WaitPolicy for NoWait {
    fn delay(&self, _range: DelayRange) -> Duration {
        Duration::ZERO
    }
}
