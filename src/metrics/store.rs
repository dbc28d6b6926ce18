use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::SecondsFormat;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::domain::{Category, RequestResult};
use crate::error::PersistenceError;
use crate::sinks::format::format_millis;

pub const LOG_HEADER: &str = "timestamp,request_index,category,target,variant,status_code,outcome,latency_ms,size_bytes,fields,error_detail";

/// Durable destination for result batches.
#[async_trait]
pub trait ResultStore: Send {
    /// Creates destinations and writes each header once, before any data row.
    async fn prepare(&mut self, categories: &[Category]) -> Result<(), PersistenceError>;

    /// Appends one batch for `category` as a single unit.
    async fn append(
        &mut self,
        category: &Category,
        rows: &[RequestResult],
    ) -> Result<(), PersistenceError>;

    /// Where `category` is persisted, for logs.
    fn describe(&self, category: &Category) -> String;
}

/// Category to file stem mapping; every planned category has an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destinations(BTreeMap<Category, String>);

impl Destinations {
    #[must_use]
    pub const fn new(stems: BTreeMap<Category, String>) -> Self {
        Self(stems)
    }

    #[must_use]
    pub fn stem(&self, category: &Category) -> Option<&str> {
        self.0.get(category).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, &str)> {
        self.0.iter().map(|(category, stem)| (category, stem.as_str()))
    }
}

/// One append-only CSV log per category under `dir`.
#[derive(Debug, Clone)]
pub struct CsvLogStore {
    dir: PathBuf,
    destinations: Destinations,
}

impl CsvLogStore {
    #[must_use]
    pub const fn new(dir: PathBuf, destinations: Destinations) -> Self {
        Self { dir, destinations }
    }

    fn path_for(&self, category: &Category) -> Result<PathBuf, PersistenceError> {
        self.destinations
            .stem(category)
            .map(|stem| self.dir.join(format!("{}.csv", stem)))
            .ok_or_else(|| PersistenceError::UnknownDestination {
                category: category.to_string(),
            })
    }
}

#[async_trait]
impl ResultStore for CsvLogStore {
    async fn prepare(&mut self, categories: &[Category]) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| PersistenceError::CreateDir {
                path: self.dir.clone(),
                source: err,
            })?;
        for category in categories {
            let path = self.path_for(category)?;
            write_header_if_empty(&path).await?;
        }
        Ok(())
    }

    async fn append(
        &mut self,
        category: &Category,
        rows: &[RequestResult],
    ) -> Result<(), PersistenceError> {
        let path = self.path_for(category)?;
        let mut buffer = String::with_capacity(rows.len().saturating_mul(160));
        for row in rows {
            write_row(&mut buffer, row).map_err(|err| PersistenceError::FormatRow { source: err })?;
        }
        let append_error = |err| PersistenceError::AppendBatch {
            path: path.clone(),
            rows: rows.len(),
            source: err,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(append_error)?;
        file.write_all(buffer.as_bytes()).await.map_err(append_error)?;
        file.flush().await.map_err(append_error)?;
        Ok(())
    }

    fn describe(&self, category: &Category) -> String {
        self.path_for(category).map_or_else(
            |_| format!("<no destination for {}>", category),
            |path| path.display().to_string(),
        )
    }
}

async fn write_header_if_empty(path: &Path) -> Result<(), PersistenceError> {
    let header_error = |err| PersistenceError::WriteHeader {
        path: path.to_path_buf(),
        source: err,
    };
    let existing_len = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata.len(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => 0,
        Err(err) => return Err(header_error(err)),
    };
    if existing_len > 0 {
        return Ok(());
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(header_error)?;
    let mut header = String::with_capacity(LOG_HEADER.len().saturating_add(1));
    header.push_str(LOG_HEADER);
    header.push('\n');
    file.write_all(header.as_bytes()).await.map_err(header_error)?;
    file.flush().await.map_err(header_error)
}

pub(crate) fn write_row(buffer: &mut String, row: &RequestResult) -> std::fmt::Result {
    let fields = row
        .outcome
        .fields()
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(";");
    let status = row.status_code.map(|code| code.to_string()).unwrap_or_default();
    let error_detail = row.outcome.error_detail().unwrap_or_default();
    writeln!(
        buffer,
        "{},{},{},{},{},{},{},{},{},{},{}",
        row.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        row.index,
        csv_field(row.category.as_str()),
        csv_field(&row.target),
        csv_field(row.variant.as_deref().unwrap_or_default()),
        status,
        row.outcome.tag(),
        format_millis(row.latency),
        row.response_bytes,
        csv_field(&fields),
        csv_field(&error_detail),
    )
}

/// Quotes a field when it holds a delimiter, quote or line break (RFC 4180).
pub(crate) fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
