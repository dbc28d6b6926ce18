use std::time::Duration;

use tokio::time::{Instant, sleep_until};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Spaces submissions at least `1/R` apart, independent of completions.
#[derive(Debug)]
pub struct RateLimiter {
    spacing: Option<Duration>,
    last_submission: Option<Instant>,
}

impl RateLimiter {
    /// `None` or zero disables pacing.
    #[must_use]
    pub fn new(rate_per_sec: Option<u32>) -> Self {
        let spacing = rate_per_sec
            .filter(|rate| *rate > 0)
            .and_then(|rate| NANOS_PER_SEC.checked_div(u64::from(rate)))
            .map(Duration::from_nanos);
        Self {
            spacing,
            last_submission: None,
        }
    }

    #[must_use]
    pub const fn spacing(&self) -> Option<Duration> {
        self.spacing
    }

    /// Sleeps until the next submission slot and claims it.
    pub async fn pace(&mut self) {
        let Some(spacing) = self.spacing else {
            return;
        };
        if let Some(deadline) = self
            .last_submission
            .and_then(|last| last.checked_add(spacing))
        {
            sleep_until(deadline).await;
        }
        self.last_submission = Some(Instant::now());
    }
}
