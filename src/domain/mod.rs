//! Units of work and their measured results.
mod outcome;
mod request;

#[cfg(test)]
mod tests;

pub use outcome::{ERROR_DETAIL_MAX_CHARS, Outcome, TransportErrorKind, truncate_detail};
pub use request::{Category, RequestDescriptor, RequestResult};
