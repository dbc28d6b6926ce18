//! HTTP transport: per-request clients and the request executor.
mod body;
mod client;
mod executor;


pub use client::{ClientSettings, ConnectionFactory, DEFAULT_USER_AGENT};
pub use executor::{Executor, HttpExecutor};
