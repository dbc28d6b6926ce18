use std::collections::BTreeMap;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{BenchArgs, PositiveU64, PositiveUsize};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::{ConfigFile, QueryTable};

/// Config-only sections with no command line counterpart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSections {
    pub query: QueryTable,
    pub params: BTreeMap<String, QueryTable>,
    pub destinations: BTreeMap<String, String>,
    /// Inline variant list; `None` when the file has none or `--variants-file` won.
    pub variants: Option<Vec<String>>,
    pub api_key_env: Option<String>,
}

/// Applies config values to every argument not given on the command line and
/// hands back the config-only sections.
///
/// # Errors
///
/// Returns an error when config values are invalid or conflict with each other.
pub fn apply_config(
    args: &mut BenchArgs,
    matches: &ArgMatches,
    config: ConfigFile,
) -> AppResult<FileSections> {
    if config.variants.is_some() && config.variants_file.is_some() {
        return Err(AppError::config(ConfigError::Conflict {
            left: "variants",
            right: "variants_file",
        }));
    }

    if !is_cli(matches, "url")
        && let Some(url) = config.url
    {
        args.url = Some(url);
    }
    if !is_cli(matches, "categories")
        && let Some(categories) = config.categories
    {
        args.categories = categories;
    }
    if !is_cli(matches, "mode")
        && let Some(mode) = config.mode
    {
        args.mode = mode;
    }
    if !is_cli(matches, "requests")
        && let Some(requests) = config.requests
    {
        args.requests = ensure_positive_u64(requests, "requests")?;
    }
    if !is_cli(matches, "total")
        && let Some(total) = config.total
    {
        args.total = Some(ensure_positive_u64(total, "total")?);
    }
    if !is_cli(matches, "concurrency")
        && let Some(concurrency) = config.concurrency
    {
        args.concurrency = ensure_positive_usize(concurrency, "concurrency")?;
    }
    if !is_cli(matches, "rate")
        && let Some(rate) = config.rate
    {
        args.rate = rate;
    }
    if !is_cli(matches, "classifier")
        && let Some(classifier) = config.classifier
    {
        args.classifier = classifier;
    }
    if !is_cli(matches, "output_dir")
        && let Some(output_dir) = config.output_dir
    {
        args.output_dir = Some(output_dir);
    }
    let variants_file_from_cli = is_cli(matches, "variants_file");
    if !variants_file_from_cli
        && let Some(variants_file) = config.variants_file
    {
        args.variants_file = Some(variants_file);
    }
    if !is_cli(matches, "proxy_host_template")
        && let Some(host) = config.proxy_host
    {
        args.proxy_host_template = Some(host);
    }
    if !is_cli(matches, "proxy_auth_template")
        && let Some(auth) = config.proxy_auth
    {
        args.proxy_auth_template = Some(auth);
    }
    if !is_cli(matches, "cache_bust_param")
        && let Some(param) = config.cache_bust_param
    {
        args.cache_bust_param = Some(param);
    }
    if !is_cli(matches, "batch_size")
        && let Some(batch_size) = config.batch_size
    {
        args.batch_size = ensure_positive_usize(batch_size, "batch_size")?;
    }
    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = timeout.to_duration("timeout")?;
    }
    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = timeout.to_duration("connect_timeout")?;
    }
    if !is_cli(matches, "monitor_interval")
        && let Some(interval) = config.monitor_interval.as_ref()
    {
        args.monitor_interval = interval.to_duration("monitor_interval")?;
    }
    if !is_cli(matches, "no_monitor")
        && let Some(no_monitor) = config.no_monitor
    {
        args.no_monitor = no_monitor;
    }
    if !is_cli(matches, "report_formats")
        && let Some(formats) = config.report
    {
        args.report_formats = formats;
    }
    if !is_cli(matches, "channel_capacity")
        && let Some(capacity) = config.channel_capacity
    {
        args.channel_capacity = ensure_positive_usize(capacity, "channel_capacity")?;
    }
    if !is_cli(matches, "cancel_grace")
        && let Some(grace) = config.cancel_grace.as_ref()
    {
        args.cancel_grace = grace.to_duration("cancel_grace")?;
    }
    if !is_cli(matches, "max_body_bytes")
        && let Some(max_body_bytes) = config.max_body_bytes
    {
        args.max_body_bytes = ensure_positive_usize(max_body_bytes, "max_body_bytes")?;
    }
    if !is_cli(matches, "insecure")
        && let Some(insecure) = config.insecure
    {
        args.insecure = insecure;
    }
    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(FileSections {
        query: config.query.unwrap_or_default(),
        params: config.params.unwrap_or_default(),
        destinations: config.destinations.unwrap_or_default(),
        variants: config.variants.filter(|_| !variants_file_from_cli),
        api_key_env: config.api_key_env,
    })
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}
