pub mod barcode;
pub mod config;
pub mod fitness;
pub mod providers;
pub mod search;
pub mod serve;

use crate::cli::Cli;
use indicatif::{ProgressBar, ProgressStyle};
use larder_core::config::ConfigError;
use larder_core::error::SearchError;
use larder_core::fitness::FitnessError;
use larder_core::{ConfigStore, LarderConfig};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Fitness error: {0}")]
    Fitness(#[from] FitnessError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// The config store selected by `--config`, or the default location.
pub fn config_store(cli: &Cli) -> ConfigStore {
    match &cli.config {
        Some(path) => ConfigStore::new(path.clone()),
        None => ConfigStore::new_default(),
    }
}

pub fn load_config(cli: &Cli) -> Result<LarderConfig> {
    Ok(config_store(cli).load()?)
}

/// Spinner on stderr; hidden for machine-readable output so stdout stays
/// parseable.
pub fn spinner(cli: &Cli, message: String) -> ProgressBar {
    if !matches!(cli.format(), crate::cli::OutputFormat::Pretty) {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
