use serde_json::Value;

use super::{Classifier, classify_json_object, field_text};
use crate::domain::Outcome;

/// Top-level keys that mark a payload as carrying search results.
const RESULT_MARKERS: [&str; 9] = [
    "organic_results",
    "inline_images",
    "local_results",
    "shopping_results",
    "jobs_results",
    "news_results",
    "video_results",
    "answer_box",
    "knowledge_graph",
];
/// A payload with metadata only (e.g. `search_metadata` + `search_parameters`).
const METADATA_ONLY_KEYS: usize = 2;

/// Accepts search API payloads that carry at least one result section.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerpClassifier;

impl Classifier for SerpClassifier {
    fn classify(&self, status: u16, body: &[u8]) -> Outcome {
        classify_json_object(status, body, |object| {
            if let Some(error) = object.get("error") {
                return Err(format!("API error: {}", field_text(error)));
            }
            let Some(metadata) = object.get("search_metadata") else {
                return Err("missing search_metadata".to_owned());
            };
            if metadata.get("status").and_then(Value::as_str) == Some("error") {
                let detail = metadata
                    .get("error")
                    .map_or_else(|| "unknown error".to_owned(), field_text);
                return Err(format!("search error: {}", detail));
            }
            let has_results = RESULT_MARKERS.iter().any(|key| object.contains_key(*key));
            if !has_results && object.len() <= METADATA_ONLY_KEYS {
                return Err("no results found".to_owned());
            }
            let mut fields = Vec::new();
            if let Some(search_id) = metadata.get("id") {
                fields.push(("search_id".to_owned(), field_text(search_id)));
            }
            Ok(fields)
        })
    }
}
