use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::{Instant, sleep};

use super::*;
use crate::args::PositiveUsize;
use crate::domain::{Category, Outcome, RequestDescriptor, RequestResult};
use crate::error::{AppError, AppResult, PersistenceError};
use crate::http::Executor;
use crate::metrics::{ResultStore, WriterConfig};
use crate::shutdown::AbandonReceiver;
use crate::shutdown_handlers::shutdown_channel;
use crate::workload::{PlanMode, RequestPlan};

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn positive(value: usize) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(AppError::validation)
}

/// Succeeds after a fixed delay and records when each request started.
#[derive(Debug, Default)]
struct MockExecutor {
    delay: Duration,
    /// Requests that never finish on their own; they wait for the abandon signal.
    hang: bool,
    starts: Mutex<Vec<Instant>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockExecutor {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn starts(&self) -> AppResult<Vec<Instant>> {
        self.starts
            .lock()
            .map(|starts| starts.clone())
            .map_err(|err| AppError::validation(format!("starts poisoned: {}", err)))
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(
        &self,
        descriptor: RequestDescriptor,
        mut abandon: AbandonReceiver,
    ) -> RequestResult {
        if let Ok(mut starts) = self.starts.lock() {
            starts.push(Instant::now());
        }
        let active = self.active.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        self.peak.fetch_max(active, Ordering::SeqCst);

        let outcome = if self.hang {
            drop(abandon.wait_for(|abandoned| *abandoned).await);
            Outcome::Timeout
        } else {
            sleep(self.delay).await;
            Outcome::Success { fields: Vec::new() }
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        RequestResult::new(&descriptor, Utc::now(), self.delay, outcome).with_response(Some(200), 64)
    }
}

type RowCounts = Arc<Mutex<BTreeMap<String, usize>>>;

/// Counts rows per category; every append fails once `fail_after` rows landed.
struct MemoryStore {
    rows: RowCounts,
    fail_after: Option<usize>,
    stored: usize,
}

impl MemoryStore {
    fn new(fail_after: Option<usize>) -> (Self, RowCounts) {
        let rows = RowCounts::default();
        (
            Self {
                rows: Arc::clone(&rows),
                fail_after,
                stored: 0,
            },
            rows,
        )
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn prepare(&mut self, categories: &[Category]) -> Result<(), PersistenceError> {
        if let Ok(mut rows) = self.rows.lock() {
            for category in categories {
                rows.entry(category.to_string()).or_insert(0);
            }
        }
        Ok(())
    }

    async fn append(
        &mut self,
        category: &Category,
        batch: &[RequestResult],
    ) -> Result<(), PersistenceError> {
        if self.fail_after.is_some_and(|limit| self.stored >= limit) {
            return Err(PersistenceError::AppendBatch {
                path: category.as_str().into(),
                rows: batch.len(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.stored = self.stored.saturating_add(batch.len());
        if let Ok(mut rows) = self.rows.lock() {
            let count = rows.entry(category.to_string()).or_insert(0);
            *count = count.saturating_add(batch.len());
        }
        Ok(())
    }

    fn describe(&self, category: &Category) -> String {
        format!("memory:{}", category)
    }
}

struct Scenario {
    categories: Vec<&'static str>,
    per_category: u64,
    concurrency: usize,
    rate: Option<u32>,
    batch_size: usize,
    cancel_grace: Duration,
}

impl Scenario {
    const fn new(categories: Vec<&'static str>, per_category: u64, concurrency: usize) -> Self {
        Self {
            categories,
            per_category,
            concurrency,
            rate: None,
            batch_size: 100,
            cancel_grace: Duration::from_secs(5),
        }
    }

    fn plan(&self) -> RequestPlan {
        RequestPlan {
            mode: PlanMode::PerCategory,
            target: Arc::from("http://example.test/json"),
            categories: self.categories.iter().map(|key| Category::new(key)).collect(),
            variants: Vec::new(),
            count: self.per_category,
            queries: Vec::new(),
            proxy: None,
        }
    }

    fn context(
        &self,
        executor: Arc<MockExecutor>,
        store: MemoryStore,
        planned: u64,
    ) -> AppResult<RunContext<MockExecutor>> {
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        Ok(RunContext {
            scheduler: SchedulerConfig {
                concurrency: positive(self.concurrency)?,
                rate_per_sec: self.rate,
                channel_capacity: positive(64)?,
                cancel_grace: self.cancel_grace,
                prune_threshold: 4,
            },
            writer: WriterConfig {
                batch_size: positive(self.batch_size)?,
                categories: self.categories.iter().map(|key| Category::new(key)).collect(),
                planned,
            },
            monitor: None,
            executor,
            store: Box::new(store),
            shutdown_tx,
        })
    }
}

#[test]
fn nine_requests_over_three_categories_are_all_persisted() -> AppResult<()> {
    run_async_test(async {
        let scenario = Scenario::new(vec!["a", "b", "c"], 3, 2);
        let executor = Arc::new(MockExecutor::new(Duration::from_millis(10)));
        let (store, rows) = MemoryStore::new(None);
        let plan = scenario.plan();
        let context = scenario.context(Arc::clone(&executor), store, plan.planned())?;

        let outcome = run(context, plan.into_descriptors()).await?;

        let summary = outcome.summary;
        if summary.planned != 9 || summary.submitted != 9 || summary.persisted != 9 {
            return Err(AppError::validation(format!(
                "Expected 9 planned/submitted/persisted, got {:?}",
                summary
            )));
        }
        if summary.cancelled || summary.peak_in_flight > 2 {
            return Err(AppError::validation(format!("Unexpected summary {:?}", summary)));
        }
        let rows = rows
            .lock()
            .map(|rows| rows.clone())
            .map_err(|err| AppError::validation(format!("rows poisoned: {}", err)))?;
        if rows.len() != 3 || rows.values().any(|count| *count != 3) {
            return Err(AppError::validation(format!("Expected 3 rows per category, got {:?}", rows)));
        }
        for stats in outcome.writer.snapshot.categories.values() {
            if stats.total != 3
                || stats.success != 3
                || stats.avg_success_latency() != Some(Duration::from_millis(10))
            {
                return Err(AppError::validation(format!(
                    "Unexpected stats for {}: {:?}",
                    stats.category, stats
                )));
            }
        }
        Ok(())
    })
}

#[test]
fn in_flight_requests_never_exceed_concurrency() -> AppResult<()> {
    run_async_test(async {
        let scenario = Scenario::new(vec!["a", "b"], 10, 3);
        let executor = Arc::new(MockExecutor::new(Duration::from_millis(5)));
        let (store, _rows) = MemoryStore::new(None);
        let plan = scenario.plan();
        let context = scenario.context(Arc::clone(&executor), store, plan.planned())?;

        let outcome = run(context, plan.into_descriptors()).await?;

        let observed = executor.peak.load(Ordering::SeqCst);
        if observed > 3 || outcome.summary.peak_in_flight > 3 {
            return Err(AppError::validation(format!(
                "Peak in flight {} / gate peak {} exceeds 3",
                observed, outcome.summary.peak_in_flight
            )));
        }
        if outcome.summary.peak_in_flight == 0 || outcome.summary.persisted != 20 {
            return Err(AppError::validation(format!(
                "Unexpected summary {:?}",
                outcome.summary
            )));
        }
        Ok(())
    })
}

#[test]
fn rate_limit_spaces_submissions() -> AppResult<()> {
    run_async_test(async {
        let mut scenario = Scenario::new(vec!["a"], 6, 100);
        scenario.rate = Some(50);
        let executor = Arc::new(MockExecutor::new(Duration::from_millis(1)));
        let (store, _rows) = MemoryStore::new(None);
        let plan = scenario.plan();
        let context = scenario.context(Arc::clone(&executor), store, plan.planned())?;

        run(context, plan.into_descriptors()).await?;

        let mut starts = executor.starts()?;
        starts.sort();
        if starts.len() != 6 {
            return Err(AppError::validation(format!("Expected 6 starts, got {}", starts.len())));
        }
        for pair in starts.windows(2) {
            if let [earlier, later] = pair {
                let gap = later.saturating_duration_since(*earlier);
                if gap < Duration::from_millis(18) {
                    return Err(AppError::validation(format!(
                        "Submissions only {:?} apart",
                        gap
                    )));
                }
            }
        }
        Ok(())
    })
}

#[test]
fn empty_plan_completes_without_rows() -> AppResult<()> {
    run_async_test(async {
        let scenario = Scenario::new(vec!["a"], 1, 2);
        let executor = Arc::new(MockExecutor::new(Duration::from_millis(1)));
        let (store, rows) = MemoryStore::new(None);
        let context = scenario.context(Arc::clone(&executor), store, 0)?;

        let outcome = run(context, Vec::<RequestDescriptor>::new().into_iter()).await?;

        if outcome.summary.submitted != 0 || outcome.summary.persisted != 0 {
            return Err(AppError::validation(format!(
                "Unexpected summary {:?}",
                outcome.summary
            )));
        }
        let rows = rows
            .lock()
            .map(|rows| rows.clone())
            .map_err(|err| AppError::validation(format!("rows poisoned: {}", err)))?;
        if rows.get("a") != Some(&0) {
            return Err(AppError::validation("Destination must be prepared even when empty"));
        }
        Ok(())
    })
}

#[test]
fn store_failure_aborts_with_persisted_and_unaccounted_counts() -> AppResult<()> {
    run_async_test(async {
        let mut scenario = Scenario::new(vec!["a", "b", "c"], 3, 2);
        scenario.batch_size = 1;
        let executor = Arc::new(MockExecutor::new(Duration::from_millis(10)));
        let (store, _rows) = MemoryStore::new(Some(4));
        let plan = scenario.plan();
        let context = scenario.context(Arc::clone(&executor), store, plan.planned())?;

        match run(context, plan.into_descriptors()).await {
            Err(AppError::Persistence(PersistenceError::RunAborted {
                persisted,
                unaccounted,
                ..
            })) if persisted == 4 && unaccounted == 5 => Ok(()),
            Err(err) => Err(AppError::validation(format!("Unexpected error: {}", err))),
            Ok(outcome) => Err(AppError::validation(format!(
                "Expected an aborted run, got {:?}",
                outcome.summary
            ))),
        }
    })
}

#[test]
fn shutdown_abandons_in_flight_requests_after_grace() -> AppResult<()> {
    run_async_test(async {
        let mut scenario = Scenario::new(vec!["a"], 10, 2);
        scenario.cancel_grace = Duration::from_millis(50);
        let executor = Arc::new(MockExecutor {
            hang: true,
            ..MockExecutor::default()
        });
        let (store, _rows) = MemoryStore::new(None);
        let plan = scenario.plan();
        let context = scenario.context(Arc::clone(&executor), store, plan.planned())?;
        let shutdown_tx = context.shutdown_tx.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            drop(shutdown_tx.send(()));
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            run(context, plan.into_descriptors()),
        )
        .await
        .map_err(|err| AppError::validation(format!("Run did not stop: {}", err)))??;

        let summary = outcome.summary;
        if !summary.cancelled || summary.submitted != 2 || summary.persisted != 2 {
            return Err(AppError::validation(format!("Unexpected summary {:?}", summary)));
        }
        let timeouts = outcome
            .writer
            .snapshot
            .categories
            .values()
            .map(|stats| stats.failures.timeout)
            .sum::<u64>();
        if timeouts != 2 {
            return Err(AppError::validation(format!("Expected 2 timeouts, got {}", timeouts)));
        }
        Ok(())
    })
}

#[test]
fn gate_tracks_outstanding_and_peak() -> AppResult<()> {
    run_async_test(async {
        let gate = ConcurrencyGate::new(2);
        let first = gate
            .acquire()
            .await
            .ok_or_else(|| AppError::validation("first permit"))?;
        let second = gate
            .acquire()
            .await
            .ok_or_else(|| AppError::validation("second permit"))?;
        if gate.outstanding() != 2 || gate.peak() != 2 {
            return Err(AppError::validation("Expected two outstanding permits"));
        }
        let third = tokio::time::timeout(Duration::from_millis(20), gate.acquire()).await;
        if third.is_ok() {
            return Err(AppError::validation("Third permit must wait"));
        }
        drop(first);
        drop(second);
        if gate.outstanding() != 0 || gate.peak() != 2 {
            return Err(AppError::validation("Permits must release on drop"));
        }
        Ok(())
    })
}

#[test]
fn rate_limiter_disabled_for_zero() -> AppResult<()> {
    if RateLimiter::new(Some(0)).spacing().is_some() || RateLimiter::new(None).spacing().is_some()
    {
        return Err(AppError::validation("Zero or unset rate must not pace"));
    }
    if RateLimiter::new(Some(4)).spacing() != Some(Duration::from_millis(250)) {
        return Err(AppError::validation("Rate 4 spaces submissions 250ms apart"));
    }
    Ok(())
}

#[test]
fn rate_is_scaled_by_one_hundred() -> AppResult<()> {
    if rate_x100(9, 1_000) != 900 || rate_x100(1, 3_000) != 33 || rate_x100(5, 0) != 0 {
        return Err(AppError::validation("Unexpected rate_x100"));
    }
    Ok(())
}

#[test]
fn pruning_counts_panicked_tasks_and_keeps_running_ones() -> AppResult<()> {
    run_async_test(async {
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let mut handles = vec![
            tokio::spawn(async {}),
            tokio::spawn(async {
                std::panic::resume_unwind(Box::new("executor task failed"));
            }),
            tokio::spawn(async move {
                drop(release_rx.await);
            }),
        ];
        let settled = async {
            while handles.iter().take(2).any(|handle| !handle.is_finished()) {
                sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(2), settled)
            .await
            .map_err(|err| AppError::validation(format!("Tasks did not finish: {}", err)))?;

        let failed = prune_finished(&mut handles).await;
        if failed != 1 || handles.len() != 1 {
            return Err(AppError::validation(format!(
                "Expected 1 failure and 1 running handle, got {} and {}",
                failed,
                handles.len()
            )));
        }
        drop(release_tx.send(()));
        for handle in handles {
            handle.await?;
        }
        Ok(())
    })
}
