use serde_json::Value;

use super::{Classifier, classify_json_object, field_text};
use crate::domain::Outcome;

/// Accepts IP echo payloads such as `{"ip": "203.0.113.7", "country": "DE"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpInfoClassifier;

impl Classifier for IpInfoClassifier {
    fn classify(&self, status: u16, body: &[u8]) -> Outcome {
        classify_json_object(status, body, |object| {
            let ip = match object.get("ip") {
                Some(Value::String(ip)) if !ip.trim().is_empty() => ip.trim().to_owned(),
                Some(_) | None => return Err("missing ip in response".to_owned()),
            };
            let mut fields = vec![("ip".to_owned(), ip)];
            if let Some(country) = object.get("country") {
                fields.push(("country".to_owned(), field_text(country)));
            }
            Ok(fields)
        })
    }
}
