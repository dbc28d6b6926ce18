use super::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Config cannot set both '{left}' and '{right}'.")]
    Conflict {
        left: &'static str,
        right: &'static str,
    },
    #[error("Config '{field}' must be >= 1: {source}")]
    FieldMustBePositive {
        field: String,
        #[source]
        source: ValidationError,
    },
    #[error("Invalid duration for '{field}': {source}")]
    InvalidDuration {
        field: &'static str,
        #[source]
        source: ValidationError,
    },
    #[error("Invalid target URL '{url}': {source}")]
    InvalidTargetUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Target URL '{url}' must use http or https.")]
    UnsupportedScheme { url: String },
    #[error("At least one category is required (set --categories or 'categories' in config).")]
    NoCategories,
    #[error("Category '{category}' is listed more than once.")]
    DuplicateCategory { category: String },
    #[error("Category key must not be empty.")]
    EmptyCategory,
    #[error("[{section}] references unknown category '{category}'.")]
    UnknownCategory {
        section: &'static str,
        category: String,
    },
    #[error("Destination '{stem}' for category '{category}' must be a plain file stem.")]
    InvalidDestination { category: String, stem: String },
    #[error("Destination '{stem}' is mapped to more than one category.")]
    DuplicateDestination { stem: String },
    #[error("Proxying requires both a host template and an auth template.")]
    IncompleteProxyTemplate,
    #[error("Proxy template renders an invalid URL '{proxy}': {source}")]
    InvalidProxyTemplate {
        proxy: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Round-robin mode requires a total request count (--total).")]
    RoundRobinRequiresTotal,
    #[error("Environment variable '{name}' named by api_key_env is not set.")]
    MissingEnv { name: String },
    #[error("Failed to read variants file '{path}': {source}")]
    ReadVariants {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Variants file '{path}' has no entries.")]
    VariantsEmpty { path: PathBuf },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
