use serde::{Deserialize, Serialize};

use crate::metrics::{CategoryStats, FailureTally, LatencyPercentiles, WriterReport};
use crate::scheduler::{RunSummary, rate_x100};

const BYTES_PER_KIB: u64 = 1_024;

/// Output formats for the aggregate report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Csv,
    Json,
}

impl ReportFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Text => "text",
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

/// Aggregate statistics for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub category: String,
    pub total_requests: u64,
    pub concurrency: usize,
    /// Requests per second over the whole run, times 100.
    pub request_rate_x100: u64,
    pub success_count: u64,
    pub success_rate_x100: u64,
    pub avg_success_latency_us: Option<u64>,
    pub p50_latency_us: Option<u64>,
    pub p90_latency_us: Option<u64>,
    pub p99_latency_us: Option<u64>,
    pub wall_time_ms: u64,
    pub avg_success_bytes: Option<u64>,
    /// Average successful response size in KiB, times 100.
    pub avg_success_kib_x100: Option<u64>,
    pub failures: FailureTally,
    pub recent_errors: Vec<String>,
}

/// Everything a renderer needs once the run is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub planned: u64,
    pub submitted: u64,
    pub persisted: u64,
    pub concurrency: usize,
    pub peak_in_flight: usize,
    pub wall_time_ms: u64,
    pub throughput_x100: u64,
    pub cancelled: bool,
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    #[must_use]
    pub fn build(summary: &RunSummary, writer: &WriterReport) -> Self {
        let wall_time_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX);
        let categories = writer
            .snapshot
            .categories
            .values()
            .map(|stats| {
                category_report(
                    stats,
                    writer.percentiles.get(&stats.category),
                    summary.concurrency,
                    wall_time_ms,
                )
            })
            .collect();
        Self {
            planned: summary.planned,
            submitted: summary.submitted,
            persisted: summary.persisted,
            concurrency: summary.concurrency,
            peak_in_flight: summary.peak_in_flight,
            wall_time_ms,
            throughput_x100: summary.throughput_x100,
            cancelled: summary.cancelled,
            categories,
        }
    }
}

fn category_report(
    stats: &CategoryStats,
    percentiles: Option<&LatencyPercentiles>,
    concurrency: usize,
    wall_time_ms: u64,
) -> CategoryReport {
    let percentiles = percentiles.filter(|_| stats.success > 0);
    let avg_success_bytes = stats.avg_success_bytes();
    CategoryReport {
        category: stats.category.to_string(),
        total_requests: stats.total,
        concurrency,
        request_rate_x100: rate_x100(stats.total, wall_time_ms),
        success_count: stats.success,
        success_rate_x100: stats.success_rate_x100(),
        avg_success_latency_us: stats
            .avg_success_latency()
            .map(|avg| u64::try_from(avg.as_micros()).unwrap_or(u64::MAX)),
        p50_latency_us: percentiles.map(|values| values.p50_us),
        p90_latency_us: percentiles.map(|values| values.p90_us),
        p99_latency_us: percentiles.map(|values| values.p99_us),
        wall_time_ms,
        avg_success_bytes,
        avg_success_kib_x100: avg_success_bytes
            .and_then(|bytes| bytes.saturating_mul(100).checked_div(BYTES_PER_KIB)),
        failures: stats.failures,
        recent_errors: stats.recent_errors.iter().cloned().collect(),
    }
}
