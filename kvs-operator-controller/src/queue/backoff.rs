// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use std::time::Duration;

/// Shortest delay ever used between attempts
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Per-item exponential backoff: `base * 2^failures`, capped at `max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(5),
            max: Duration::from_secs(1000),
        }
    }
}

impl ExponentialBackoff {
    /// A zero `base` is raised to [`MIN_DELAY`] and `max` is never below `base`
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(MIN_DELAY);

        Self { base, max: max.max(base) }
    }

    /// Delay before the next attempt after `failures` consecutive failures
    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.min(31);

        self.base
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}
