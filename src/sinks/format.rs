use std::fmt::Write as _;
use std::time::Duration;

use crate::error::{AppError, AppResult, SinkError};

pub(crate) fn write_line(output: &mut String, line: &str) -> AppResult<()> {
    writeln!(output, "{}", line).map_err(|err| AppError::sink(SinkError::WriteLine { source: err }))
}

/// Renders a value scaled by 100 with two decimals.
pub(crate) fn format_x100(value: u64) -> String {
    format!(
        "{}.{:02}",
        value.checked_div(100).unwrap_or(0),
        value.checked_rem(100).unwrap_or(0)
    )
}

/// Renders a value scaled by 1000 with three decimals.
pub(crate) fn format_thousandths(value: u128) -> String {
    format!(
        "{}.{:03}",
        value.checked_div(1000).unwrap_or(0),
        value.checked_rem(1000).unwrap_or(0)
    )
}

/// Milliseconds with microsecond precision.
pub(crate) fn format_millis(duration: Duration) -> String {
    format_thousandths(duration.as_micros())
}
