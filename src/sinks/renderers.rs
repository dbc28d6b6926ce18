use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::format::{format_thousandths, format_x100, write_line};
use super::report::{CategoryReport, ReportFormat, RunReport};
use crate::error::{AppError, AppResult, SinkError};

pub const SUMMARY_CSV_FILE: &str = "summary_statistics.csv";
pub const SUMMARY_JSON_FILE: &str = "summary_statistics.json";
pub const SUMMARY_CSV_HEADER: &str = "category,total_requests,concurrency,request_rate_per_sec,success_count,success_rate_pct,avg_success_latency_ms,p50_latency_ms,p90_latency_ms,p99_latency_ms,wall_time_s,avg_success_size_kib";
const RULE_WIDTH: usize = 70;

/// Consumes the finished report.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the report cannot be formatted or written.
    async fn render(&self, report: &RunReport) -> AppResult<()>;
}

/// Human-readable table on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

#[derive(Debug, Clone)]
pub struct CsvReport {
    path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct JsonReport {
    path: PathBuf,
}

impl CsvReport {
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SUMMARY_CSV_FILE),
        }
    }
}

impl JsonReport {
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SUMMARY_JSON_FILE),
        }
    }
}

/// One renderer per distinct format, in the order given.
#[must_use]
pub fn build_renderers(formats: &[ReportFormat], dir: &Path) -> Vec<Box<dyn ReportRenderer>> {
    let mut seen = Vec::with_capacity(formats.len());
    let mut renderers: Vec<Box<dyn ReportRenderer>> = Vec::with_capacity(formats.len());
    for format in formats {
        if seen.contains(format) {
            continue;
        }
        seen.push(*format);
        match format {
            ReportFormat::Text => renderers.push(Box::new(TextReport)),
            ReportFormat::Csv => renderers.push(Box::new(CsvReport::new(dir))),
            ReportFormat::Json => renderers.push(Box::new(JsonReport::new(dir))),
        }
    }
    renderers
}

/// Runs every renderer, stopping at the first failure.
///
/// # Errors
///
/// Returns the first renderer error.
pub async fn render_all(renderers: &[Box<dyn ReportRenderer>], report: &RunReport) -> AppResult<()> {
    for renderer in renderers {
        renderer.render(report).await?;
    }
    Ok(())
}

#[async_trait]
impl ReportRenderer for TextReport {
    async fn render(&self, report: &RunReport) -> AppResult<()> {
        let output = text_report(report)?;
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(output.as_bytes())
            .await
            .map_err(|err| AppError::sink(SinkError::Stdout { source: err }))?;
        stdout
            .flush()
            .await
            .map_err(|err| AppError::sink(SinkError::Stdout { source: err }))
    }
}

#[async_trait]
impl ReportRenderer for CsvReport {
    async fn render(&self, report: &RunReport) -> AppResult<()> {
        let output = csv_report(report)?;
        write_report(&self.path, output.as_bytes()).await?;
        info!("Summary saved to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ReportRenderer for JsonReport {
    async fn render(&self, report: &RunReport) -> AppResult<()> {
        let mut output = serde_json::to_vec_pretty(report)
            .map_err(|err| AppError::sink(SinkError::SerializeReport { source: err }))?;
        output.push(b'\n');
        write_report(&self.path, &output).await?;
        info!("Summary saved to {}", self.path.display());
        Ok(())
    }
}

async fn write_report(path: &Path, contents: &[u8]) -> AppResult<()> {
    let report_error = |err| {
        AppError::sink(SinkError::WriteReport {
            path: path.to_path_buf(),
            source: err,
        })
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(report_error)?;
    }
    tokio::fs::write(path, contents).await.map_err(report_error)
}

fn millis_cell(micros: Option<u64>) -> String {
    micros.map_or_else(String::new, |value| format_thousandths(u128::from(value)))
}

fn x100_cell(value: Option<u64>) -> String {
    value.map_or_else(String::new, format_x100)
}

pub(crate) fn csv_report(report: &RunReport) -> AppResult<String> {
    let mut output = String::new();
    write_line(&mut output, SUMMARY_CSV_HEADER)?;
    for category in &report.categories {
        write_line(
            &mut output,
            &format!(
                "{},{},{},{},{},{},{},{},{},{},{},{}",
                crate::metrics::csv_field(&category.category),
                category.total_requests,
                category.concurrency,
                format_x100(category.request_rate_x100),
                category.success_count,
                format_x100(category.success_rate_x100),
                millis_cell(category.avg_success_latency_us),
                millis_cell(category.p50_latency_us),
                millis_cell(category.p90_latency_us),
                millis_cell(category.p99_latency_us),
                format_thousandths(u128::from(category.wall_time_ms)),
                x100_cell(category.avg_success_kib_x100),
            ),
        )?;
    }
    Ok(output)
}

pub(crate) fn text_report(report: &RunReport) -> AppResult<String> {
    let mut output = String::new();
    let rule = "=".repeat(RULE_WIDTH);
    write_line(&mut output, &rule)?;
    write_line(&mut output, "SUMMARY STATISTICS")?;
    write_line(&mut output, &rule)?;
    write_line(
        &mut output,
        &format!(
            "Requests: {} planned, {} submitted, {} persisted{}",
            report.planned,
            report.submitted,
            report.persisted,
            if report.cancelled { " (cancelled)" } else { "" }
        ),
    )?;
    write_line(
        &mut output,
        &format!(
            "Wall time: {}s, throughput: {} req/s, concurrency: {} (peak in flight {})",
            format_thousandths(u128::from(report.wall_time_ms)),
            format_x100(report.throughput_x100),
            report.concurrency,
            report.peak_in_flight
        ),
    )?;
    for category in &report.categories {
        write_category(&mut output, category)?;
    }
    write_line(&mut output, &rule)?;
    Ok(output)
}

fn write_category(output: &mut String, category: &CategoryReport) -> AppResult<()> {
    let or_dash = |cell: String| if cell.is_empty() { "-".to_owned() } else { cell };
    write_line(output, "")?;
    write_line(output, &format!("[{}]", category.category))?;
    write_line(
        output,
        &format!(
            "  requests: {}  success: {} ({}%)  rate: {} req/s",
            category.total_requests,
            category.success_count,
            format_x100(category.success_rate_x100),
            format_x100(category.request_rate_x100)
        ),
    )?;
    write_line(
        output,
        &format!(
            "  latency ms: avg {}  p50 {}  p90 {}  p99 {}",
            or_dash(millis_cell(category.avg_success_latency_us)),
            or_dash(millis_cell(category.p50_latency_us)),
            or_dash(millis_cell(category.p90_latency_us)),
            or_dash(millis_cell(category.p99_latency_us))
        ),
    )?;
    write_line(
        output,
        &format!(
            "  avg size: {} KiB",
            or_dash(x100_cell(category.avg_success_kib_x100))
        ),
    )?;
    let failures = category.failures;
    if failures.total() > 0 {
        write_line(
            output,
            &format!(
                "  failures: http={} timeout={} transport={} parse={} validation={}",
                failures.http,
                failures.timeout,
                failures.transport,
                failures.parse,
                failures.validation
            ),
        )?;
        for sample in &category.recent_errors {
            write_line(output, &format!("    {}", sample))?;
        }
    }
    Ok(())
}
