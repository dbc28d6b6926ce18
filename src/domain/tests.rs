use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::*;

fn descriptor() -> RequestDescriptor {
    RequestDescriptor {
        index: 7,
        category: Category::new("eu"),
        target: Arc::from("https://example.test/json"),
        query: Arc::from(Vec::new()),
        proxy: None,
        variant: Some(Arc::from("DE")),
    }
}

#[test]
fn truncate_detail_keeps_first_line_only() -> Result<(), String> {
    let detail = truncate_detail("connection refused\n  at socket.rs:12");
    if detail != "connection refused" {
        return Err(format!("Unexpected detail: {}", detail));
    }
    Ok(())
}

#[test]
fn truncate_detail_cuts_long_messages() -> Result<(), String> {
    let raw = "x".repeat(ERROR_DETAIL_MAX_CHARS.saturating_add(50));
    let detail = truncate_detail(&raw);
    if !detail.ends_with("...") {
        return Err("Expected truncation suffix".to_owned());
    }
    let kept = detail.chars().count().saturating_sub(3);
    if kept != ERROR_DETAIL_MAX_CHARS {
        return Err(format!("Expected {} chars, got {}", ERROR_DETAIL_MAX_CHARS, kept));
    }
    Ok(())
}

#[test]
fn truncate_detail_leaves_short_messages_alone() -> Result<(), String> {
    let raw = "y".repeat(ERROR_DETAIL_MAX_CHARS);
    if truncate_detail(&raw) != raw {
        return Err("Message at the limit must not be cut".to_owned());
    }
    Ok(())
}

#[test]
fn outcome_tags_and_details() -> Result<(), String> {
    let cases = [
        (Outcome::HttpError { status: 503 }, "http_error", Some("HTTP 503")),
        (Outcome::Timeout, "timeout", Some("timeout")),
        (
            Outcome::transport(TransportErrorKind::Connect, "refused"),
            "transport_error",
            Some("connect: refused"),
        ),
        (Outcome::Success { fields: Vec::new() }, "success", None),
    ];
    for (outcome, tag, detail) in cases {
        if outcome.tag() != tag {
            return Err(format!("Unexpected tag {} for {:?}", outcome.tag(), outcome));
        }
        if outcome.error_detail().as_deref() != detail {
            return Err(format!("Unexpected detail for {:?}", outcome));
        }
    }
    Ok(())
}

#[test]
fn result_copies_descriptor_identity() -> Result<(), String> {
    let descriptor = descriptor();
    let result = RequestResult::new(
        &descriptor,
        Utc::now(),
        Duration::from_millis(12),
        Outcome::Timeout,
    )
    .with_response(Some(200), 64);
    if result.index != 7 || result.category.as_str() != "eu" {
        return Err("Descriptor identity not copied".to_owned());
    }
    if result.variant.as_deref() != Some("DE") || result.response_bytes != 64 {
        return Err("Variant or size not carried".to_owned());
    }
    Ok(())
}
