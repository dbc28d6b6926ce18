use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::args::parse_duration_value;
use crate::classify::ClassifierKind;
use crate::error::{AppError, AppResult, ConfigError, ValidationError};
use crate::sinks::ReportFormat;
use crate::workload::PlanMode;

/// Query parameter table keyed by parameter name.
pub type QueryTable = BTreeMap<String, ParamValue>;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub categories: Option<Vec<String>>,
    pub mode: Option<PlanMode>,
    pub requests: Option<u64>,
    pub total: Option<u64>,
    #[serde(alias = "max_concurrency")]
    pub concurrency: Option<usize>,
    #[serde(alias = "request_rate")]
    pub rate: Option<u32>,
    pub classifier: Option<ClassifierKind>,
    pub output_dir: Option<String>,
    pub variants: Option<Vec<String>>,
    pub variants_file: Option<String>,
    pub proxy_host: Option<String>,
    pub proxy_auth: Option<String>,
    pub cache_bust_param: Option<String>,
    pub batch_size: Option<usize>,
    pub timeout: Option<DurationValue>,
    pub connect_timeout: Option<DurationValue>,
    pub monitor_interval: Option<DurationValue>,
    pub no_monitor: Option<bool>,
    pub report: Option<Vec<ReportFormat>>,
    pub channel_capacity: Option<usize>,
    pub cancel_grace: Option<DurationValue>,
    pub max_body_bytes: Option<usize>,
    pub insecure: Option<bool>,
    pub no_color: Option<bool>,
    /// Query parameters sent with every request.
    pub query: Option<QueryTable>,
    /// Per-category query parameters, overriding `query` on name clashes.
    pub params: Option<BTreeMap<String, QueryTable>>,
    /// Category key to log file stem.
    pub destinations: Option<BTreeMap<String, String>>,
    /// Environment variable whose value is sent as `api_key`.
    pub api_key_env: Option<String>,
}

/// Scalar query value; TOML and JSON tables may hold strings, numbers or booleans.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(text) => f.write_str(text),
            ParamValue::Integer(value) => write!(f, "{}", value),
            ParamValue::Float(value) => write!(f, "{}", value),
            ParamValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self, field: &'static str) -> AppResult<Duration> {
        let parsed = match self {
            DurationValue::Seconds(0) => Err(ValidationError::DurationZero),
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration_value(text),
        };
        parsed.map_err(|err| AppError::config(ConfigError::InvalidDuration { field, source: err }))
    }
}
