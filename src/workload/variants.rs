use std::collections::HashSet;
use std::path::Path;

use crate::error::{AppError, AppResult, ConfigError};

/// Reads a newline-delimited variant list.
///
/// # Errors
///
/// Returns an error when the file cannot be read or holds no entries.
pub fn read_variants(path: &Path) -> AppResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadVariants {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    let variants = parse_variants(&content);
    if variants.is_empty() {
        return Err(AppError::config(ConfigError::VariantsEmpty {
            path: path.to_path_buf(),
        }));
    }
    Ok(variants)
}

/// Trims each line, skips blanks, and drops repeats while keeping first-seen order.
#[must_use]
pub fn parse_variants(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_owned)
        .collect()
}
