use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use super::apply::FileSections;
use super::types::QueryTable;
use crate::args::{BenchArgs, PositiveUsize};
use crate::classify::ClassifierKind;
use crate::domain::Category;
use crate::error::{AppError, AppResult, ConfigError, ValidationError};
use crate::http::{ClientSettings, DEFAULT_USER_AGENT};
use crate::metrics::{Destinations, MonitorConfig};
use crate::scheduler::SchedulerConfig;
use crate::sinks::{ReportFormat, SUMMARY_CSV_FILE, SUMMARY_JSON_FILE};
use crate::workload::{PlanMode, ProxyTemplate, RequestPlan, parse_variants, read_variants};

const API_KEY_PARAM: &str = "api_key";

/// Fully validated settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub plan: RequestPlan,
    pub client: ClientSettings,
    pub classifier: ClassifierKind,
    pub cache_bust_param: Option<String>,
    pub max_body_bytes: PositiveUsize,
    pub scheduler: SchedulerConfig,
    pub batch_size: PositiveUsize,
    pub monitor: Option<MonitorConfig>,
    pub output_dir: PathBuf,
    pub destinations: Destinations,
    pub report_formats: Vec<ReportFormat>,
}

/// Validates merged arguments and config sections into a [`RunConfig`].
///
/// # Errors
///
/// Returns an error for a missing or malformed URL, an empty or repeated
/// category list, sections naming unknown categories, unusable destination
/// stems, an incomplete proxy template, an unset API key variable or an
/// unreadable variants file.
pub fn build_run_config(args: &BenchArgs, sections: FileSections) -> AppResult<RunConfig> {
    let target = validate_target(args.url.as_deref())?;
    let categories = validate_categories(&args.categories)?;
    let count = match args.mode {
        PlanMode::PerCategory => {
            if args.total.is_some() {
                warn!("--total is ignored in per-category mode; use --requests.");
            }
            args.requests.get()
        }
        PlanMode::RoundRobin => args
            .total
            .map(|total| total.get())
            .ok_or_else(|| AppError::config(ConfigError::RoundRobinRequiresTotal))?,
    };

    let FileSections {
        query,
        params,
        destinations,
        variants,
        api_key_env,
    } = sections;
    let destinations = resolve_destinations(&categories, destinations)?;
    let queries = resolve_queries(&categories, query, params, api_key_env.as_deref())?;
    let variants = resolve_variants(variants, args.variants_file.as_deref())?;
    let proxy = resolve_proxy(
        args.proxy_host_template.as_deref(),
        args.proxy_auth_template.as_deref(),
        &categories,
        variants.first().map(AsRef::as_ref),
    )?;

    if args.insecure {
        warn!("TLS certificate verification is disabled (--insecure).");
    }
    let output_dir = args.output_dir.as_ref().map_or_else(
        || PathBuf::from(Local::now().format("%Y-%m-%d").to_string()),
        PathBuf::from,
    );

    let plan = RequestPlan {
        mode: args.mode,
        target: Arc::from(target.as_str()),
        categories,
        variants,
        count,
        queries,
        proxy,
    };
    info!(
        "Plan: {} mode, {} categories, {} variants, {} requests.",
        plan.mode.as_str(),
        plan.categories.len(),
        plan.variants.len(),
        plan.planned()
    );

    Ok(RunConfig {
        plan,
        client: ClientSettings {
            connect_timeout: args.connect_timeout,
            request_timeout: args.request_timeout,
            insecure: args.insecure,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        },
        classifier: args.classifier,
        cache_bust_param: args
            .cache_bust_param
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned),
        max_body_bytes: args.max_body_bytes,
        scheduler: SchedulerConfig {
            concurrency: args.concurrency,
            rate_per_sec: Some(args.rate).filter(|rate| *rate > 0),
            channel_capacity: args.channel_capacity,
            cancel_grace: args.cancel_grace,
            prune_threshold: SchedulerConfig::DEFAULT_PRUNE_THRESHOLD,
        },
        batch_size: args.batch_size,
        monitor: (!args.no_monitor).then_some(MonitorConfig {
            interval: args.monitor_interval,
            color: !args.no_color,
        }),
        output_dir,
        destinations,
        report_formats: args.report_formats.clone(),
    })
}

fn validate_target(url: Option<&str>) -> AppResult<url::Url> {
    let raw = url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::validation(ValidationError::MissingUrl))?;
    let parsed = url::Url::parse(raw).map_err(|err| {
        AppError::config(ConfigError::InvalidTargetUrl {
            url: raw.to_owned(),
            source: err,
        })
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(AppError::config(ConfigError::UnsupportedScheme {
            url: raw.to_owned(),
        })),
    }
}

fn validate_categories(keys: &[String]) -> AppResult<Vec<Category>> {
    if keys.is_empty() {
        return Err(AppError::config(ConfigError::NoCategories));
    }
    let mut seen = HashSet::with_capacity(keys.len());
    let mut categories = Vec::with_capacity(keys.len());
    for key in keys {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::config(ConfigError::EmptyCategory));
        }
        if !seen.insert(key) {
            return Err(AppError::config(ConfigError::DuplicateCategory {
                category: key.to_owned(),
            }));
        }
        categories.push(Category::new(key));
    }
    Ok(categories)
}

fn ensure_known(
    section: &'static str,
    categories: &[Category],
    keys: impl Iterator<Item = String>,
) -> AppResult<()> {
    for key in keys {
        if !categories.iter().any(|category| category.as_str() == key) {
            return Err(AppError::config(ConfigError::UnknownCategory {
                section,
                category: key,
            }));
        }
    }
    Ok(())
}

/// Every category gets a stem; unmapped categories default to their key.
fn resolve_destinations(
    categories: &[Category],
    mapped: BTreeMap<String, String>,
) -> AppResult<Destinations> {
    ensure_known("destinations", categories, mapped.keys().cloned())?;
    let mut stems = BTreeMap::new();
    let mut used = BTreeSet::new();
    for category in categories {
        let stem = mapped
            .get(category.as_str())
            .map_or(category.as_str(), String::as_str)
            .trim();
        if !is_plain_stem(stem) {
            return Err(AppError::config(ConfigError::InvalidDestination {
                category: category.to_string(),
                stem: stem.to_owned(),
            }));
        }
        if !used.insert(stem.to_owned()) {
            return Err(AppError::config(ConfigError::DuplicateDestination {
                stem: stem.to_owned(),
            }));
        }
        stems.insert(category.clone(), stem.to_owned());
    }
    Ok(Destinations::new(stems))
}

fn is_plain_stem(stem: &str) -> bool {
    let reserved = [SUMMARY_CSV_FILE, SUMMARY_JSON_FILE]
        .iter()
        .filter_map(|file| Path::new(file).file_stem())
        .any(|reserved| reserved == stem);
    !stem.is_empty()
        && !reserved
        && stem != "."
        && stem != ".."
        && !stem.contains(['/', '\\', '\0'])
}

/// Shared query first, then the category's own params (replacing clashes),
/// then the API key.
fn resolve_queries(
    categories: &[Category],
    shared: QueryTable,
    params: BTreeMap<String, QueryTable>,
    api_key_env: Option<&str>,
) -> AppResult<Vec<Arc<[(String, String)]>>> {
    ensure_known("params", categories, params.keys().cloned())?;
    let api_key = api_key_env
        .map(|name| {
            std::env::var(name).map_err(|_err| {
                AppError::config(ConfigError::MissingEnv {
                    name: name.to_owned(),
                })
            })
        })
        .transpose()?;

    let queries: Vec<Arc<[(String, String)]>> = categories
        .iter()
        .map(|category| {
            let mut merged: BTreeMap<&str, String> = shared
                .iter()
                .map(|(name, value)| (name.as_str(), value.to_string()))
                .collect();
            if let Some(own) = params.get(category.as_str()) {
                merged.extend(own.iter().map(|(name, value)| (name.as_str(), value.to_string())));
            }
            if let Some(key) = api_key.as_ref() {
                merged.insert(API_KEY_PARAM, key.clone());
            }
            merged
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect()
        })
        .collect();
    Ok(queries)
}

fn resolve_variants(
    inline: Option<Vec<String>>,
    variants_file: Option<&str>,
) -> AppResult<Vec<Arc<str>>> {
    let variants = match (variants_file, inline) {
        (Some(path), _) => read_variants(Path::new(path))?,
        (None, Some(inline)) => parse_variants(&inline.join("\n")),
        (None, None) => Vec::new(),
    };
    Ok(variants.into_iter().map(Arc::from).collect())
}

fn resolve_proxy(
    host: Option<&str>,
    auth: Option<&str>,
    categories: &[Category],
    sample_variant: Option<&str>,
) -> AppResult<Option<ProxyTemplate>> {
    fn non_empty(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|value| !value.is_empty())
    }
    match (non_empty(host), non_empty(auth)) {
        (None, None) => Ok(None),
        (Some(host), Some(auth)) => {
            let template = ProxyTemplate::new(host, auth);
            template
                .validate(categories, sample_variant)
                .map_err(AppError::config)?;
            Ok(Some(template))
        }
        (Some(_), None) | (None, Some(_)) => {
            Err(AppError::config(ConfigError::IncompleteProxyTemplate))
        }
    }
}
