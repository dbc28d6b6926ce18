//! Result persistence and live statistics.
mod histogram;
mod monitor;
mod stats;
mod store;
mod writer;


pub use histogram::{LatencyHistogram, LatencyPercentiles};
pub use monitor::{MonitorConfig, spawn_monitor};
pub use stats::{CategoryStats, ERROR_SAMPLE_CAPACITY, FailureTally, StatsSnapshot};
pub(crate) use store::csv_field;
pub use store::{CsvLogStore, Destinations, LOG_HEADER, ResultStore};
pub use writer::{
    BatchWriter, SNAPSHOT_INTERVAL, WriterConfig, WriterFailure, WriterReport, WriterState,
    spawn_writer,
};
