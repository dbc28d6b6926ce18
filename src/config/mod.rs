//! Configuration loading, merging and validation.
mod apply;
mod loader;
mod resolve;
pub mod types;


pub use apply::{FileSections, apply_config};
pub use loader::load_config;
pub use resolve::{RunConfig, build_run_config};

#[cfg(test)]
pub(crate) use loader::load_config_file;
