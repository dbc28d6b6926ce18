use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use serde::Serialize;

use crate::domain::{Category, Outcome, RequestResult};

/// Recent error samples kept per category.
pub const ERROR_SAMPLE_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureTally {
    pub http: u64,
    pub timeout: u64,
    pub transport: u64,
    pub parse: u64,
    pub validation: u64,
}

impl FailureTally {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.http
            .saturating_add(self.timeout)
            .saturating_add(self.transport)
            .saturating_add(self.parse)
            .saturating_add(self.validation)
    }
}

/// Running aggregate for one category. Only the writer mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStats {
    pub category: Category,
    pub total: u64,
    pub success: u64,
    /// Successes only.
    pub success_latency_sum: Duration,
    /// Successes only.
    pub success_bytes_sum: u64,
    pub min_success_latency: Option<Duration>,
    pub max_success_latency: Option<Duration>,
    pub failures: FailureTally,
    pub recent_errors: VecDeque<String>,
}

impl CategoryStats {
    #[must_use]
    pub fn new(category: Category) -> Self {
        Self {
            category,
            total: 0,
            success: 0,
            success_latency_sum: Duration::ZERO,
            success_bytes_sum: 0,
            min_success_latency: None,
            max_success_latency: None,
            failures: FailureTally::default(),
            recent_errors: VecDeque::with_capacity(ERROR_SAMPLE_CAPACITY),
        }
    }

    pub fn record(&mut self, result: &RequestResult) {
        self.total = self.total.saturating_add(1);
        match &result.outcome {
            Outcome::Success { .. } => {
                self.success = self.success.saturating_add(1);
                self.success_latency_sum = self.success_latency_sum.saturating_add(result.latency);
                self.success_bytes_sum = self.success_bytes_sum.saturating_add(result.response_bytes);
                self.min_success_latency = Some(
                    self.min_success_latency
                        .map_or(result.latency, |min| min.min(result.latency)),
                );
                self.max_success_latency = Some(
                    self.max_success_latency
                        .map_or(result.latency, |max| max.max(result.latency)),
                );
            }
            Outcome::HttpError { .. } => {
                self.failures.http = self.failures.http.saturating_add(1);
            }
            Outcome::Timeout => {
                self.failures.timeout = self.failures.timeout.saturating_add(1);
            }
            Outcome::TransportError { .. } => {
                self.failures.transport = self.failures.transport.saturating_add(1);
            }
            Outcome::ParseError { .. } => {
                self.failures.parse = self.failures.parse.saturating_add(1);
            }
            Outcome::ValidationError { .. } => {
                self.failures.validation = self.failures.validation.saturating_add(1);
            }
        }
        if let Some(detail) = result.outcome.error_detail() {
            if self.recent_errors.len() >= ERROR_SAMPLE_CAPACITY {
                self.recent_errors.pop_front();
            }
            self.recent_errors.push_back(detail);
        }
    }

    #[must_use]
    pub fn avg_success_latency(&self) -> Option<Duration> {
        let micros = self
            .success_latency_sum
            .as_micros()
            .checked_div(u128::from(self.success))?;
        Some(Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX)))
    }

    #[must_use]
    pub fn avg_success_bytes(&self) -> Option<u64> {
        self.success_bytes_sum.checked_div(self.success)
    }

    /// Success share of all results, in hundredths of a percent.
    #[must_use]
    pub fn success_rate_x100(&self) -> u64 {
        self.success
            .saturating_mul(10_000)
            .checked_div(self.total)
            .unwrap_or(0)
    }
}

/// Read-only copy of every category's stats, published by the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub persisted: u64,
    pub categories: BTreeMap<Category, CategoryStats>,
}
