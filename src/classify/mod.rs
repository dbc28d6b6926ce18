//! Response classification.
//!
//! Every classifier follows the same state machine: a non-2xx status is an
//! [`Outcome::HttpError`], a 2xx body that does not parse is an
//! [`Outcome::ParseError`], a parsed body that fails the domain rules is an
//! [`Outcome::ValidationError`], and anything else is a success.
mod ipinfo;
mod serp;


use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Outcome;

pub use ipinfo::IpInfoClassifier;
pub use serp::SerpClassifier;

pub trait Classifier: Send + Sync + fmt::Debug {
    /// Classifies a fully received response. `body` holds the retained prefix
    /// of the response body.
    fn classify(&self, status: u16, body: &[u8]) -> Outcome;
}

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Any 2xx response is a success.
    Status,
    /// JSON body with a non-empty `ip` field.
    Ipinfo,
    /// Search API payload with result markers.
    Serp,
}

impl ClassifierKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ClassifierKind::Status => "status",
            ClassifierKind::Ipinfo => "ipinfo",
            ClassifierKind::Serp => "serp",
        }
    }
}

#[must_use]
pub fn build_classifier(kind: ClassifierKind) -> Arc<dyn Classifier> {
    match kind {
        ClassifierKind::Status => Arc::new(StatusClassifier),
        ClassifierKind::Ipinfo => Arc::new(IpInfoClassifier),
        ClassifierKind::Serp => Arc::new(SerpClassifier),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusClassifier;

impl Classifier for StatusClassifier {
    fn classify(&self, status: u16, _body: &[u8]) -> Outcome {
        if is_success_status(status) {
            Outcome::Success { fields: Vec::new() }
        } else {
            Outcome::HttpError { status }
        }
    }
}

const fn is_success_status(status: u16) -> bool {
    status >= 200 && status < 300
}

/// Runs the shared status/parse steps, then hands the JSON object to
/// `validate`, which returns the extracted fields or a rejection reason.
fn classify_json_object<F>(status: u16, body: &[u8], validate: F) -> Outcome
where
    F: FnOnce(&Map<String, Value>) -> Result<Vec<(String, String)>, String>,
{
    if !is_success_status(status) {
        return Outcome::HttpError { status };
    }
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => return Outcome::parse_error(&format!("invalid JSON response: {}", err)),
    };
    let Value::Object(object) = value else {
        return Outcome::parse_error("invalid JSON response: expected an object");
    };
    match validate(&object) {
        Ok(fields) => Outcome::Success { fields },
        Err(reason) => Outcome::validation(&reason),
    }
}

/// Renders a JSON value as a plain field value (strings without quotes).
fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}
