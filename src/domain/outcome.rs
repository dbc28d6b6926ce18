use std::fmt;

/// Longest error detail kept on a result, in characters.
pub const ERROR_DETAIL_MAX_CHARS: usize = 300;
const TRUNCATION_SUFFIX: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The client or request could not be built.
    Config,
    Connect,
    Redirect,
    Body,
    Decode,
    Request,
    Other,
}

impl TransportErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TransportErrorKind::Config => "config",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Redirect => "redirect",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Decode => "decode",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of one request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { fields: Vec<(String, String)> },
    HttpError { status: u16 },
    Timeout,
    TransportError {
        kind: TransportErrorKind,
        detail: String,
    },
    ParseError { detail: String },
    ValidationError { reason: String },
}

impl Outcome {
    #[must_use]
    pub fn transport(kind: TransportErrorKind, detail: &str) -> Self {
        Outcome::TransportError {
            kind,
            detail: truncate_detail(detail),
        }
    }

    #[must_use]
    pub fn parse_error(detail: &str) -> Self {
        Outcome::ParseError {
            detail: truncate_detail(detail),
        }
    }

    #[must_use]
    pub fn validation(reason: &str) -> Self {
        Outcome::ValidationError {
            reason: truncate_detail(reason),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Stable tag used in logs and reports.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::HttpError { .. } => "http_error",
            Outcome::Timeout => "timeout",
            Outcome::TransportError { .. } => "transport_error",
            Outcome::ParseError { .. } => "parse_error",
            Outcome::ValidationError { .. } => "validation_error",
        }
    }

    /// Human-readable failure description, `None` for successes.
    #[must_use]
    pub fn error_detail(&self) -> Option<String> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::HttpError { status } => Some(format!("HTTP {}", status)),
            Outcome::Timeout => Some("timeout".to_owned()),
            Outcome::TransportError { kind, detail } => Some(format!("{}: {}", kind, detail)),
            Outcome::ParseError { detail } => Some(detail.clone()),
            Outcome::ValidationError { reason } => Some(reason.clone()),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        match self {
            Outcome::Success { fields } => fields,
            Outcome::HttpError { .. }
            | Outcome::Timeout
            | Outcome::TransportError { .. }
            | Outcome::ParseError { .. }
            | Outcome::ValidationError { .. } => &[],
        }
    }
}

/// Keeps the first line of `raw`, cut to [`ERROR_DETAIL_MAX_CHARS`] characters.
#[must_use]
pub fn truncate_detail(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or_default().trim_end();
    if first_line.chars().count() <= ERROR_DETAIL_MAX_CHARS {
        return first_line.to_owned();
    }
    let mut truncated: String = first_line.chars().take(ERROR_DETAIL_MAX_CHARS).collect();
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}
