//! Core library for the `latbench` CLI.
//!
//! The binary enumerates request descriptors per category, submits them
//! through a rate limiter and a concurrency gate, times each request on a
//! fresh connection, classifies the response, and hands every result to a
//! single writer task that appends per-category CSV logs and keeps running
//! statistics. Library APIs follow the CLI and may change with it.
pub mod app;
pub mod args;
pub mod classify;
pub mod config;
pub mod domain;
pub mod entry;
pub mod error;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod scheduler;
pub mod shutdown;
pub mod shutdown_handlers;
pub mod sinks;
pub mod workload;
