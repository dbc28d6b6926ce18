//! Wires a validated run configuration to the scheduler and report sinks.
mod runner;

pub use runner::run_local;
