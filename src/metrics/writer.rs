use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::histogram::{LatencyHistogram, LatencyPercentiles};
use super::stats::{CategoryStats, StatsSnapshot};
use super::store::ResultStore;
use crate::args::PositiveUsize;
use crate::domain::{Category, RequestResult};
use crate::error::PersistenceError;
use crate::shutdown::ShutdownSender;

/// Longest pause between snapshot publications while results keep arriving.
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub batch_size: PositiveUsize,
    pub categories: Vec<Category>,
    /// Used for progress logs only.
    pub planned: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Accumulating,
    Flushing,
    Drained,
}

/// Final state handed back once the channel is drained.
#[derive(Debug, Clone, Default)]
pub struct WriterReport {
    pub snapshot: StatsSnapshot,
    pub percentiles: BTreeMap<Category, LatencyPercentiles>,
    pub consumed: u64,
    pub persisted: u64,
}

/// The store failed; `persisted` rows made it to disk before (and after) that.
#[derive(Debug)]
pub struct WriterFailure {
    pub consumed: u64,
    pub persisted: u64,
    pub error: PersistenceError,
}

/// Sole consumer of the result channel. Owns buffers, stats, and the store.
pub struct BatchWriter {
    config: WriterConfig,
    store: Box<dyn ResultStore>,
    buffers: BTreeMap<Category, Vec<RequestResult>>,
    stats: BTreeMap<Category, CategoryStats>,
    histograms: BTreeMap<Category, LatencyHistogram>,
    consumed: u64,
    persisted: u64,
    discarded: u64,
    failed: BTreeSet<Category>,
    failure: Option<PersistenceError>,
    state: WriterState,
    snapshot_tx: watch::Sender<StatsSnapshot>,
    shutdown_tx: ShutdownSender,
    last_publish: Instant,
}

impl BatchWriter {
    #[must_use]
    pub fn new(
        config: WriterConfig,
        store: Box<dyn ResultStore>,
        snapshot_tx: watch::Sender<StatsSnapshot>,
        shutdown_tx: ShutdownSender,
    ) -> Self {
        let mut writer = Self {
            config,
            store,
            buffers: BTreeMap::new(),
            stats: BTreeMap::new(),
            histograms: BTreeMap::new(),
            consumed: 0,
            persisted: 0,
            discarded: 0,
            failed: BTreeSet::new(),
            failure: None,
            state: WriterState::Accumulating,
            snapshot_tx,
            shutdown_tx,
            last_publish: Instant::now(),
        };
        for category in writer.config.categories.clone() {
            writer.track(&category);
        }
        writer
    }

    #[must_use]
    pub const fn state(&self) -> WriterState {
        self.state
    }

    /// Consumes results until every sender is gone, then flushes what is left.
    ///
    /// # Errors
    ///
    /// Returns a [`WriterFailure`] when any store operation failed. The channel
    /// is still drained to the end in that case.
    pub async fn run(
        mut self,
        mut result_rx: mpsc::Receiver<RequestResult>,
    ) -> Result<WriterReport, WriterFailure> {
        let categories = self.config.categories.clone();
        if let Err(err) = self.store.prepare(&categories).await {
            error!("Failed to prepare result logs: {}", err);
            self.failed.extend(categories);
            self.fail(err);
        }
        self.publish();

        while let Some(result) = result_rx.recv().await {
            self.accept(result).await;
        }
        self.finish().await
    }

    async fn accept(&mut self, result: RequestResult) {
        self.consumed = self.consumed.saturating_add(1);
        let category = result.category.clone();
        self.track(&category);

        if let Some(stats) = self.stats.get_mut(&category) {
            stats.record(&result);
        }
        if result.outcome.is_success()
            && let Some(histogram) = self.histograms.get_mut(&category)
        {
            let micros = u64::try_from(result.latency.as_micros()).unwrap_or(u64::MAX);
            if let Err(err) = histogram.record(micros) {
                warn!("Dropping latency sample for {}: {}", category, err);
            }
        }

        let buffered = self.buffers.get_mut(&category).map_or(0, |buffer| {
            buffer.push(result);
            buffer.len()
        });
        if buffered >= self.config.batch_size.get() {
            self.flush(&category).await;
        } else if self.last_publish.elapsed() >= SNAPSHOT_INTERVAL {
            self.publish();
        }
    }

    async fn flush(&mut self, category: &Category) {
        let rows = match self.buffers.get_mut(category) {
            Some(buffer) if !buffer.is_empty() => std::mem::take(buffer),
            Some(_) | None => return,
        };
        let row_count = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        if self.failed.contains(category) {
            self.discarded = self.discarded.saturating_add(row_count);
            return;
        }

        self.state = WriterState::Flushing;
        match self.store.append(category, &rows).await {
            Ok(()) => {
                self.persisted = self.persisted.saturating_add(row_count);
                info!(
                    "Flushed {} rows to {} (total {}/{})",
                    row_count,
                    self.store.describe(category),
                    self.persisted,
                    self.config.planned
                );
            }
            Err(err) => {
                error!(
                    "Failed to flush {} rows for {}: {}",
                    row_count, category, err
                );
                self.discarded = self.discarded.saturating_add(row_count);
                self.failed.insert(category.clone());
                self.fail(err);
            }
        }
        self.state = WriterState::Accumulating;
        self.publish();
    }

    async fn finish(mut self) -> Result<WriterReport, WriterFailure> {
        let pending: Vec<Category> = self
            .buffers
            .iter()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(category, _)| category.clone())
            .collect();
        for category in pending {
            self.flush(&category).await;
        }
        self.state = WriterState::Drained;
        self.publish();

        info!(
            "Writer drained: {} results consumed, {} persisted.",
            self.consumed, self.persisted
        );
        if self.discarded > 0 {
            warn!("{} results could not be persisted.", self.discarded);
        }

        match self.failure.take() {
            Some(error) => Err(WriterFailure {
                consumed: self.consumed,
                persisted: self.persisted,
                error,
            }),
            None => Ok(WriterReport {
                snapshot: self.snapshot(),
                percentiles: self
                    .histograms
                    .iter()
                    .map(|(category, histogram)| (category.clone(), histogram.percentiles()))
                    .collect(),
                consumed: self.consumed,
                persisted: self.persisted,
            }),
        }
    }

    fn track(&mut self, category: &Category) {
        if self.stats.contains_key(category) {
            return;
        }
        self.stats
            .insert(category.clone(), CategoryStats::new(category.clone()));
        self.buffers.insert(category.clone(), Vec::new());
        match LatencyHistogram::new() {
            Ok(histogram) => {
                self.histograms.insert(category.clone(), histogram);
            }
            Err(err) => warn!("No latency percentiles for {}: {}", category, err),
        }
    }

    /// Keeps the first failure and asks the scheduler to stop submitting.
    fn fail(&mut self, err: PersistenceError) {
        if self.failure.is_none() {
            self.failure = Some(err);
            drop(self.shutdown_tx.send(()));
        }
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.consumed,
            persisted: self.persisted,
            categories: self.stats.clone(),
        }
    }

    fn publish(&mut self) {
        drop(self.snapshot_tx.send_replace(self.snapshot()));
        self.last_publish = Instant::now();
    }
}

/// Spawns the writer task.
#[must_use]
pub fn spawn_writer(
    writer: BatchWriter,
    result_rx: mpsc::Receiver<RequestResult>,
) -> JoinHandle<Result<WriterReport, WriterFailure>> {
    tokio::spawn(writer.run(result_rx))
}
