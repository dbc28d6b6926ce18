use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::format::{format_millis, format_thousandths, format_x100};
use super::renderers::{csv_report, text_report};
use super::*;
use crate::domain::{Category, Outcome, RequestDescriptor, RequestResult};
use crate::error::{AppError, AppResult};
use crate::metrics::{CategoryStats, LatencyPercentiles, StatsSnapshot, WriterReport};
use crate::scheduler::RunSummary;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn result(latency_ms: u64, outcome: Outcome) -> RequestResult {
    let descriptor = RequestDescriptor {
        index: 1,
        category: Category::new("na"),
        target: Arc::from("http://example.test/json"),
        query: Arc::from(Vec::new()),
        proxy: None,
        variant: None,
    };
    RequestResult::new(
        &descriptor,
        Utc::now(),
        Duration::from_millis(latency_ms),
        outcome,
    )
    .with_response(Some(200), 2048)
}

fn sample_report() -> RunReport {
    let mut stats = CategoryStats::new(Category::new("na"));
    stats.record(&result(10, Outcome::Success { fields: Vec::new() }));
    stats.record(&result(30, Outcome::Success { fields: Vec::new() }));
    stats.record(&result(900, Outcome::Timeout));

    let mut categories = BTreeMap::new();
    categories.insert(Category::new("na"), stats);
    let mut percentiles = BTreeMap::new();
    percentiles.insert(
        Category::new("na"),
        LatencyPercentiles {
            p50_us: 10_000,
            p90_us: 30_000,
            p99_us: 30_000,
        },
    );
    let writer = WriterReport {
        snapshot: StatsSnapshot {
            processed: 3,
            persisted: 3,
            categories,
        },
        percentiles,
        consumed: 3,
        persisted: 3,
    };
    let summary = RunSummary {
        planned: 3,
        submitted: 3,
        persisted: 3,
        elapsed: Duration::from_secs(2),
        throughput_x100: 150,
        peak_in_flight: 3,
        concurrency: 4,
        cancelled: false,
    };
    RunReport::build(&summary, &writer)
}

#[test]
fn report_derives_rates_and_averages() -> AppResult<()> {
    let report = sample_report();
    let category = report
        .categories
        .first()
        .ok_or_else(|| AppError::validation("Missing category"))?;
    if category.total_requests != 3
        || category.success_count != 2
        || category.success_rate_x100 != 6666
        || category.request_rate_x100 != 150
    {
        return Err(AppError::validation(format!("Unexpected counts {:?}", category)));
    }
    if category.avg_success_latency_us != Some(20_000)
        || category.avg_success_bytes != Some(2048)
        || category.avg_success_kib_x100 != Some(200)
    {
        return Err(AppError::validation(format!("Unexpected averages {:?}", category)));
    }
    if category.failures.timeout != 1 || category.recent_errors != ["timeout"] {
        return Err(AppError::validation("Unexpected failures"));
    }
    Ok(())
}

#[test]
fn csv_report_has_one_row_per_category() -> AppResult<()> {
    let output = csv_report(&sample_report())?;
    let lines: Vec<&str> = output.lines().collect();
    let expected = [
        SUMMARY_CSV_HEADER,
        "na,3,4,1.50,2,66.66,20.000,10.000,30.000,30.000,2.000,2.00",
    ];
    if lines != expected {
        return Err(AppError::validation(format!("Unexpected CSV {:?}", lines)));
    }
    Ok(())
}

#[test]
fn text_report_lists_each_category() -> AppResult<()> {
    let output = text_report(&sample_report())?;
    for needle in [
        "SUMMARY STATISTICS",
        "[na]",
        "success: 2 (66.66%)",
        "latency ms: avg 20.000  p50 10.000  p90 30.000  p99 30.000",
        "failures: http=0 timeout=1",
    ] {
        if !output.contains(needle) {
            return Err(AppError::validation(format!(
                "Missing '{}' in:\n{}",
                needle, output
            )));
        }
    }
    Ok(())
}

#[test]
fn categories_without_successes_leave_latency_blank() -> AppResult<()> {
    let mut report = sample_report();
    if let Some(category) = report.categories.first_mut() {
        category.avg_success_latency_us = None;
        category.p50_latency_us = None;
        category.p90_latency_us = None;
        category.p99_latency_us = None;
        category.avg_success_kib_x100 = None;
    }
    let output = csv_report(&report)?;
    if !output.contains("na,3,4,1.50,2,66.66,,,,,2.000,\n") {
        return Err(AppError::validation(format!("Unexpected CSV {}", output)));
    }
    let text = text_report(&report)?;
    if !text.contains("avg -  p50 -") {
        return Err(AppError::validation(format!("Unexpected text {}", text)));
    }
    Ok(())
}

#[test]
fn renderers_are_built_once_per_format() -> AppResult<()> {
    let dir = tempfile::tempdir()?;
    let renderers = build_renderers(
        &[ReportFormat::Csv, ReportFormat::Json, ReportFormat::Csv],
        dir.path(),
    );
    if renderers.len() != 2 {
        return Err(AppError::validation(format!(
            "Expected 2 renderers, got {}",
            renderers.len()
        )));
    }
    Ok(())
}

#[test]
fn file_renderers_write_summary_files() -> AppResult<()> {
    run_async_test(async {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("nested");
        let renderers = build_renderers(&[ReportFormat::Csv, ReportFormat::Json], &out);
        render_all(&renderers, &sample_report()).await?;

        let csv = tokio::fs::read_to_string(out.join(SUMMARY_CSV_FILE)).await?;
        if !csv.starts_with(SUMMARY_CSV_HEADER) {
            return Err(AppError::validation("CSV summary missing header"));
        }
        let json = tokio::fs::read_to_string(out.join(SUMMARY_JSON_FILE)).await?;
        let value: serde_json::Value = serde_json::from_str(&json)
            .map_err(|err| AppError::validation(format!("Invalid JSON: {}", err)))?;
        let first_total = value
            .get("categories")
            .and_then(|categories| categories.get(0))
            .and_then(|category| category.get("total_requests"))
            .and_then(serde_json::Value::as_u64);
        if first_total != Some(3) {
            return Err(AppError::validation(format!("Unexpected JSON {}", json)));
        }
        Ok(())
    })
}

#[test]
fn scaled_values_render_with_fixed_decimals() -> AppResult<()> {
    if format_x100(6666) != "66.66"
        || format_x100(5) != "0.05"
        || format_thousandths(2_000) != "2.000"
        || format_millis(Duration::from_micros(12_345)) != "12.345"
    {
        return Err(AppError::validation("Unexpected fixed-point rendering"));
    }
    Ok(())
}
