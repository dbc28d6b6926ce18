mod app;
mod config;
mod http;
mod metrics;
mod persistence;
mod sink;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use http::HttpError;
pub use metrics::MetricsError;
pub use persistence::PersistenceError;
pub use sink::SinkError;
pub use validation::ValidationError;
