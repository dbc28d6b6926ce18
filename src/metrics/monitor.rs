use std::io::{IsTerminal, Write};
use std::time::Duration;

use chrono::{DateTime, Local};
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use super::stats::StatsSnapshot;
use crate::sinks::format::format_millis;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub color: bool,
}

/// Renders the latest snapshot every `interval` until the writer drops its
/// sender, then renders once more.
#[must_use]
pub fn spawn_monitor(
    config: MonitorConfig,
    mut snapshot_rx: watch::Receiver<StatsSnapshot>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let use_terminal = config.color && std::io::stderr().is_terminal();
        let mut ticker = tokio::time::interval(config.interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = snapshot_rx.borrow_and_update().clone();
                    emit(&snapshot, use_terminal);
                }
                changed = snapshot_rx.changed() => {
                    if changed.is_err() {
                        let snapshot = snapshot_rx.borrow().clone();
                        emit(&snapshot, use_terminal);
                        break;
                    }
                }
            }
        }
    })
}

fn emit(snapshot: &StatsSnapshot, use_terminal: bool) {
    let lines = progress_lines(snapshot, Local::now());
    if lines.is_empty() {
        return;
    }
    if use_terminal && render_colored(&lines).is_ok() {
        return;
    }
    for line in &lines {
        info!("{}", line.text);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProgressLine {
    pub(crate) text: String,
    pub(crate) color: Option<Color>,
}

impl ProgressLine {
    const fn plain(text: String) -> Self {
        Self { text, color: None }
    }

    const fn colored(text: String, color: Color) -> Self {
        Self {
            text,
            color: Some(color),
        }
    }
}

/// Formats a snapshot; nothing is rendered before the first result arrives.
pub(crate) fn progress_lines(snapshot: &StatsSnapshot, now: DateTime<Local>) -> Vec<ProgressLine> {
    if snapshot.processed == 0 {
        return Vec::new();
    }
    let mut lines = Vec::with_capacity(snapshot.categories.len().saturating_add(4));
    lines.push(ProgressLine::plain("=".repeat(RULE_WIDTH)));
    lines.push(ProgressLine::colored(
        format!("Monitor {}", now.format("%Y-%m-%d %H:%M:%S")),
        Color::Cyan,
    ));
    lines.push(ProgressLine::plain(format!(
        "processed: {} (persisted {})",
        snapshot.processed, snapshot.persisted
    )));
    for stats in snapshot.categories.values() {
        let avg = stats
            .avg_success_latency()
            .map_or_else(|| "-".to_owned(), |avg| format!("{}ms", format_millis(avg)));
        let color = if stats.total > 0 && stats.success == stats.total {
            Color::Green
        } else {
            Color::Yellow
        };
        lines.push(ProgressLine::colored(
            format!(
                "  {}: count={} success={} avg_latency={}",
                stats.category, stats.total, stats.success, avg
            ),
            color,
        ));
    }
    lines.push(ProgressLine::plain("=".repeat(RULE_WIDTH)));
    lines
}

fn render_colored(lines: &[ProgressLine]) -> Result<(), std::io::Error> {
    let mut out = std::io::stderr();
    for line in lines {
        if let Some(color) = line.color {
            queue!(out, SetForegroundColor(color), Print(&line.text), ResetColor)?;
        } else {
            queue!(out, Print(&line.text))?;
        }
        queue!(out, Print("\n"))?;
    }
    out.flush()?;
    Ok(())
}
