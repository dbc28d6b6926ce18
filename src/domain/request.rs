use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::Outcome;

/// Grouping label used to route results and aggregate statistics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(Arc<str>);

impl Category {
    #[must_use]
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// One logical request. Built by the enumerator and handed to exactly one
/// executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// 1-based position in the plan.
    pub index: u64,
    pub category: Category,
    pub target: Arc<str>,
    pub query: Arc<[(String, String)]>,
    /// Proxy URL with embedded credentials.
    pub proxy: Option<String>,
    pub variant: Option<Arc<str>>,
}

/// Measured result of one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestResult {
    pub index: u64,
    pub category: Category,
    pub target: Arc<str>,
    pub variant: Option<Arc<str>>,
    /// Wall-clock time the attempt started.
    pub timestamp: DateTime<Utc>,
    pub latency: Duration,
    pub status_code: Option<u16>,
    pub response_bytes: u64,
    pub outcome: Outcome,
}

impl RequestResult {
    #[must_use]
    pub fn new(
        descriptor: &RequestDescriptor,
        timestamp: DateTime<Utc>,
        latency: Duration,
        outcome: Outcome,
    ) -> Self {
        Self {
            index: descriptor.index,
            category: descriptor.category.clone(),
            target: Arc::clone(&descriptor.target),
            variant: descriptor.variant.clone(),
            timestamp,
            latency,
            status_code: None,
            response_bytes: 0,
            outcome,
        }
    }

    #[must_use]
    pub const fn with_response(mut self, status_code: Option<u16>, response_bytes: u64) -> Self {
        self.status_code = status_code;
        self.response_bytes = response_bytes;
        self
    }
}
