use std::ffi::OsString;

use clap::{CommandFactory, FromArgMatches};
use tracing::error;

use crate::app::run_local;
use crate::args::BenchArgs;
use crate::config::{FileSections, apply_config, build_run_config, load_config};
use crate::error::AppResult;

/// Parses the command line, merges the config file and runs the benchmark on
/// a multi-threaded runtime.
///
/// # Errors
///
/// Returns an error for invalid arguments or configuration, or when the run
/// itself fails.
pub fn run() -> AppResult<()> {
    run_from(std::env::args_os())
}

/// Same as [`run`] with an explicit argument list.
///
/// # Errors
///
/// See [`run`].
pub fn run_from<I>(raw_args: I) -> AppResult<()>
where
    I: IntoIterator<Item = OsString>,
{
    let matches = BenchArgs::command().get_matches_from(raw_args);
    let mut args = BenchArgs::from_arg_matches(&matches)?;
    crate::logger::init_logging(args.verbose);

    let resolved = load_config(args.config.as_deref()).and_then(|config| {
        let sections = match config {
            Some(config) => apply_config(&mut args, &matches, config)?,
            None => FileSections::default(),
        };
        build_run_config(&args, sections)
    });
    let run_config = match resolved {
        Ok(run_config) => run_config,
        Err(err) => {
            error!("{}", err);
            return Err(err);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    match runtime.block_on(run_local(run_config)) {
        Ok(_) => Ok(()),
        Err(err) => {
            error!("{}", err);
            Err(err)
        }
    }
}
