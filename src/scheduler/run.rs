use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};

use super::gate::ConcurrencyGate;
use super::rate::RateLimiter;
use crate::args::PositiveUsize;
use crate::error::{AppError, AppResult, PersistenceError};
use crate::http::Executor;
use crate::metrics::{
    BatchWriter, MonitorConfig, ResultStore, StatsSnapshot, WriterConfig, WriterReport,
    spawn_monitor, spawn_writer,
};
use crate::shutdown::{AbandonReceiver, AbandonSender, ShutdownReceiver, ShutdownSender};
use crate::workload::Enumerator;

const MILLIS_PER_SEC: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub concurrency: PositiveUsize,
    /// `None` or zero submits as fast as permits allow.
    pub rate_per_sec: Option<u32>,
    pub channel_capacity: PositiveUsize,
    pub cancel_grace: Duration,
    /// Finished join handles are pruned once this many are held.
    pub prune_threshold: usize,
}

impl SchedulerConfig {
    pub const DEFAULT_PRUNE_THRESHOLD: usize = 5_000;
}

/// Everything one run owns; handed to [`run`] by value.
pub struct RunContext<E> {
    pub scheduler: SchedulerConfig,
    pub writer: WriterConfig,
    pub monitor: Option<MonitorConfig>,
    pub executor: Arc<E>,
    pub store: Box<dyn ResultStore>,
    pub shutdown_tx: ShutdownSender,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub planned: u64,
    pub submitted: u64,
    pub persisted: u64,
    pub elapsed: Duration,
    /// Results per second, times 100.
    pub throughput_x100: u64,
    pub peak_in_flight: usize,
    pub concurrency: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub writer: WriterReport,
}

/// Events per second times 100; zero when no time elapsed.
#[must_use]
pub fn rate_x100(count: u64, elapsed_ms: u64) -> u64 {
    count
        .saturating_mul(100)
        .saturating_mul(MILLIS_PER_SEC)
        .checked_div(elapsed_ms)
        .unwrap_or(0)
}

/// Submits every descriptor of `plan`, then drains the writer and monitor.
///
/// # Errors
///
/// Returns [`PersistenceError::RunAborted`] when the store failed, or an error
/// when the writer task itself could not be joined.
pub async fn run<E, P>(context: RunContext<E>, plan: P) -> AppResult<RunOutcome>
where
    E: Executor,
    P: Enumerator,
{
    let RunContext {
        scheduler,
        writer,
        monitor,
        executor,
        store,
        shutdown_tx,
    } = context;
    let planned = plan.planned();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let (result_tx, result_rx) = mpsc::channel(scheduler.channel_capacity.get());
    let (snapshot_tx, snapshot_rx) = watch::channel(StatsSnapshot::default());
    let monitor_handle = monitor.map(|config| spawn_monitor(config, snapshot_rx));
    let writer_handle = spawn_writer(
        BatchWriter::new(writer, store, snapshot_tx, shutdown_tx.clone()),
        result_rx,
    );
    let (abandon_tx, abandon_rx): (AbandonSender, AbandonReceiver) = watch::channel(false);

    let gate = ConcurrencyGate::new(scheduler.concurrency.get());
    let mut limiter = RateLimiter::new(scheduler.rate_per_sec);
    let mut handles: Vec<JoinHandle<()>> = Vec::new();
    let mut submitted: u64 = 0;
    let mut pruned_failures: usize = 0;
    let mut cancelled = false;
    let started = Instant::now();

    info!(
        "Starting run: {} requests planned, concurrency {}, {}.",
        planned,
        scheduler.concurrency.get(),
        limiter
            .spacing()
            .map_or_else(|| "no rate limit".to_owned(), |spacing| format!("one submission every {:?}", spacing))
    );

    for descriptor in plan {
        let permit = tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                cancelled = true;
                break;
            }
            permit = async {
                limiter.pace().await;
                gate.acquire().await
            } => permit,
        };
        let Some(permit) = permit else {
            break;
        };

        let executor = Arc::clone(&executor);
        let result_tx = result_tx.clone();
        let abandon_rx = abandon_rx.clone();
        handles.push(tokio::spawn(async move {
            let index = descriptor.index;
            let result = executor.execute(descriptor, abandon_rx).await;
            if result_tx.send(result).await.is_err() {
                error!("Result channel closed, dropping result {}.", index);
            }
            drop(permit);
        }));
        submitted = submitted.saturating_add(1);
        if handles.len() > scheduler.prune_threshold {
            pruned_failures = pruned_failures.saturating_add(prune_finished(&mut handles).await);
        }
    }
    drop(result_tx);
    if cancelled {
        info!(
            "Shutdown requested after {} of {} submissions.",
            submitted, planned
        );
    }

    let executors = join_all(handles);
    tokio::pin!(executors);
    let joined = tokio::select! {
        joined = executors.as_mut() => joined,
        () = wait_for_cancel(cancelled, &mut shutdown_rx) => {
            cancelled = true;
            info!("Waiting up to {:?} for in-flight requests.", scheduler.cancel_grace);
            tokio::select! {
                joined = executors.as_mut() => joined,
                () = sleep(scheduler.cancel_grace) => {
                    warn!(
                        "{} requests still in flight after the grace period, abandoning them.",
                        gate.outstanding()
                    );
                    abandon_tx.send_replace(true);
                    executors.as_mut().await
                }
            }
        }
    };
    let panicked = joined
        .iter()
        .filter(|outcome| outcome.is_err())
        .count()
        .saturating_add(pruned_failures);
    if panicked > 0 {
        error!("{} executor tasks failed without producing a result.", panicked);
    }

    let writer_result = writer_handle.await?;
    if let Some(handle) = monitor_handle
        && let Err(err) = handle.await
    {
        warn!("Monitor task failed: {}", err);
    }
    let elapsed = started.elapsed();

    let report = match writer_result {
        Ok(report) => report,
        Err(failure) => {
            let unaccounted = planned.saturating_sub(failure.persisted);
            error!(
                "Run aborted: {} persisted, {} unaccounted.",
                failure.persisted, unaccounted
            );
            return Err(AppError::persistence(PersistenceError::RunAborted {
                persisted: failure.persisted,
                unaccounted,
                source: Box::new(failure.error),
            }));
        }
    };
    if submitted != report.persisted {
        warn!(
            "{} requests submitted but {} results persisted.",
            submitted, report.persisted
        );
    }

    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let summary = RunSummary {
        planned,
        submitted,
        persisted: report.persisted,
        elapsed,
        throughput_x100: rate_x100(report.consumed, elapsed_ms),
        peak_in_flight: gate.peak(),
        concurrency: scheduler.concurrency.get(),
        cancelled,
    };
    info!(
        "Run finished: {} persisted of {} planned in {:?}.",
        summary.persisted, planned, elapsed
    );
    Ok(RunOutcome {
        summary,
        writer: report,
    })
}

/// Drops finished handles, returning how many of them ended in a panic.
pub(super) async fn prune_finished(handles: &mut Vec<JoinHandle<()>>) -> usize {
    let mut failed: usize = 0;
    let mut pending = Vec::with_capacity(handles.len());
    for handle in handles.drain(..) {
        if !handle.is_finished() {
            pending.push(handle);
        } else if handle.await.is_err() {
            failed = failed.saturating_add(1);
        }
    }
    *handles = pending;
    failed
}

/// Resolves once a shutdown was requested; never resolves otherwise.
async fn wait_for_cancel(already_cancelled: bool, shutdown_rx: &mut ShutdownReceiver) {
    if already_cancelled {
        return;
    }
    match shutdown_rx.recv().await {
        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
        Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
    }
}
