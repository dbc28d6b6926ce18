//! Submission loop: rate pacing, the concurrency gate and run teardown.
mod gate;
mod rate;
mod run;

#[cfg(test)]
mod tests;

#[cfg(test)]
use run::prune_finished;

pub use gate::{ConcurrencyGate, GatePermit};
pub use rate::RateLimiter;
pub use run::{RunContext, RunOutcome, RunSummary, SchedulerConfig, rate_x100, run};
