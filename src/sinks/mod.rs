//! Aggregate report model and its renderers.
pub(crate) mod format;
mod renderers;
mod report;

#[cfg(test)]
mod tests;

pub use renderers::{
    CsvReport, JsonReport, ReportRenderer, SUMMARY_CSV_FILE, SUMMARY_CSV_HEADER,
    SUMMARY_JSON_FILE, TextReport, build_renderers, render_all,
};
pub use report::{CategoryReport, ReportFormat, RunReport};
