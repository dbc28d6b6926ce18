use clap::Parser;
use std::time::Duration;

use crate::classify::ClassifierKind;
use crate::sinks::ReportFormat;
use crate::workload::PlanMode;

use super::parsers::{parse_duration_arg, parse_positive_u64, parse_positive_usize};
use super::types::{PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Async HTTP latency harness: per-category proxy and API benchmarking with bounded concurrency, rate pacing, and batched result logs.",
    next_help_heading = "Advanced Options"
)]
pub struct BenchArgs {
    /// Path to a TOML/JSON config file (defaults to ./latbench.toml or ./latbench.json)
    #[arg(long, short = 'C', help_heading = "Common Options")]
    pub config: Option<String>,

    /// Target URL requested for every descriptor
    #[arg(long, short, help_heading = "Common Options")]
    pub url: Option<String>,

    /// Category keys (comma-separated)
    #[arg(
        long,
        short = 'g',
        value_delimiter = ',',
        help_heading = "Common Options"
    )]
    pub categories: Vec<String>,

    /// How descriptors are enumerated
    #[arg(
        long,
        default_value = "per-category",
        value_enum,
        help_heading = "Common Options"
    )]
    pub mode: PlanMode,

    /// Requests per category and variant (per-category mode)
    #[arg(
        long,
        short = 'n',
        default_value = "10",
        value_parser = parse_positive_u64,
        help_heading = "Common Options"
    )]
    pub requests: PositiveU64,

    /// Total requests (round-robin mode)
    #[arg(long, value_parser = parse_positive_u64, help_heading = "Common Options")]
    pub total: Option<PositiveU64>,

    /// Maximum number of requests in flight
    #[arg(
        long,
        short = 'c',
        default_value = "100",
        value_parser = parse_positive_usize,
        help_heading = "Common Options"
    )]
    pub concurrency: PositiveUsize,

    /// Submissions per second (0 = unlimited)
    #[arg(long, short = 'r', default_value = "0", help_heading = "Common Options")]
    pub rate: u32,

    /// Response classifier
    #[arg(
        long,
        default_value = "status",
        value_enum,
        help_heading = "Common Options"
    )]
    pub classifier: ClassifierKind,

    /// Output directory for category logs and reports (defaults to ./YYYY-MM-DD)
    #[arg(long = "output-dir", short = 'o', help_heading = "Common Options")]
    pub output_dir: Option<String>,

    /// Newline-delimited variant (country) list
    #[arg(long = "variants-file")]
    pub variants_file: Option<String>,

    /// Proxy host template, `{category}` is substituted (e.g. edge.{category}.proxy.example:9999)
    #[arg(long = "proxy-host", requires = "proxy_auth_template")]
    pub proxy_host_template: Option<String>,

    /// Proxy credentials template, `{variant}` is substituted (e.g. user-country-{variant}:secret)
    #[arg(long = "proxy-auth", requires = "proxy_host_template")]
    pub proxy_auth_template: Option<String>,

    /// Append `<name>=<unix_micros>_<index>` to every request
    #[arg(long = "cache-bust-param")]
    pub cache_bust_param: Option<String>,

    /// Results buffered per category before a flush
    #[arg(long = "batch-size", default_value = "2000", value_parser = parse_positive_usize)]
    pub batch_size: PositiveUsize,

    /// Total request timeout (e.g. 500ms, 20s)
    #[arg(long = "timeout", default_value = "20s", value_parser = parse_duration_arg)]
    pub request_timeout: Duration,

    /// Connect timeout
    #[arg(long = "connect-timeout", default_value = "10s", value_parser = parse_duration_arg)]
    pub connect_timeout: Duration,

    /// Interval between monitor snapshots
    #[arg(long = "monitor-interval", default_value = "10s", value_parser = parse_duration_arg)]
    pub monitor_interval: Duration,

    /// Disable the periodic monitor
    #[arg(long = "no-monitor")]
    pub no_monitor: bool,

    /// Report formats (comma-separated)
    #[arg(
        long = "report",
        value_enum,
        value_delimiter = ',',
        default_value = "text,csv"
    )]
    pub report_formats: Vec<ReportFormat>,

    /// Result channel capacity
    #[arg(long = "channel-capacity", default_value = "10000", value_parser = parse_positive_usize)]
    pub channel_capacity: PositiveUsize,

    /// Time in-flight requests get to finish after a shutdown signal
    #[arg(long = "cancel-grace", default_value = "5s", value_parser = parse_duration_arg)]
    pub cancel_grace: Duration,

    /// Response body bytes kept for classification
    #[arg(
        long = "max-body-bytes",
        default_value = "8388608",
        value_parser = parse_positive_usize
    )]
    pub max_body_bytes: PositiveUsize,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Disable colored monitor output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}
