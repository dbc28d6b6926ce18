use std::sync::Arc;

use tracing::{info, warn};

use crate::classify::build_classifier;
use crate::config::RunConfig;
use crate::error::{AppError, AppResult};
use crate::http::{ConnectionFactory, HttpExecutor};
use crate::metrics::{CsvLogStore, WriterConfig};
use crate::scheduler::{self, RunContext};
use crate::shutdown_handlers::{setup_signal_shutdown_handler, shutdown_channel};
use crate::sinks::{RunReport, build_renderers, render_all};

/// Runs one benchmark in-process and renders its report.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be set up, the result store
/// fails, or a report cannot be written.
pub async fn run_local(config: RunConfig) -> AppResult<RunReport> {
    let RunConfig {
        plan,
        client,
        classifier,
        cache_bust_param,
        max_body_bytes,
        scheduler,
        batch_size,
        monitor,
        output_dir,
        destinations,
        report_formats,
    } = config;

    let factory = ConnectionFactory::new(client);
    factory.validate().map_err(AppError::http)?;
    let executor = Arc::new(HttpExecutor::new(
        factory,
        build_classifier(classifier),
        cache_bust_param,
        max_body_bytes.get(),
    ));
    info!(
        "Writing results under {} ({} classifier).",
        output_dir.display(),
        classifier.as_str()
    );

    let (shutdown_tx, _shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);
    let context = RunContext {
        scheduler,
        writer: WriterConfig {
            batch_size,
            categories: plan.categories.clone(),
            planned: plan.planned(),
        },
        monitor,
        executor,
        store: Box::new(CsvLogStore::new(output_dir.clone(), destinations)),
        shutdown_tx: shutdown_tx.clone(),
    };
    let outcome = scheduler::run(context, plan.into_descriptors()).await;

    drop(shutdown_tx.send(()));
    if let Err(err) = signal_handle.await {
        warn!("Signal handler task failed: {}", err);
    }
    let outcome = outcome?;

    let report = RunReport::build(&outcome.summary, &outcome.writer);
    let renderers = build_renderers(&report_formats, &output_dir);
    render_all(&renderers, &report).await?;
    Ok(report)
}
