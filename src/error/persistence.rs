use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write header to '{path}': {source}")]
    WriteHeader {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to append {rows} rows to '{path}': {source}")]
    AppendBatch {
        path: PathBuf,
        rows: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("No destination is configured for category '{category}'.")]
    UnknownDestination { category: String },
    #[error("Failed to render log row: {source}")]
    FormatRow {
        #[source]
        source: std::fmt::Error,
    },
    #[error("Run aborted, {persisted} persisted, {unaccounted} unaccounted: {source}")]
    RunAborted {
        persisted: u64,
        unaccounted: u64,
        #[source]
        source: Box<PersistenceError>,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
