//! The command-line arguments and configuration system for the `mend` binary.

use clap::Parser;
use code_fix::{FixConfig, ValidationConfig};
use config::ConfigError;
use config::FileFormat::Toml;
use mend_core::llm::LLMConfig;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Command-line arguments for the `mend` binary.
#[derive(Debug, Parser)]
#[command(name = "mend")]
#[command(about = "Suggest a bug fix for a source file with a local LLM and apply it", long_about = None)]
pub struct Args {
    /// Source file to fix.
    // Should always be present unless using --print-config-path
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Set a configuration value; format $NAME=$VALUE (e.g. llm.model=qwen2.5-coder).
    #[arg(long, short)]
    pub config: Vec<String>,

    /// Apply the fix without asking for confirmation.
    #[arg(long, short)]
    pub yes: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Prints out the location of the config file.
    #[arg(long)]
    pub print_config_path: bool,
}

/// Deserialized configuration, before it is split up for the fix tool.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub llm: LLMConfig,
    pub validation: ValidationConfig,

    #[serde(flatten)]
    pub unknown: HashMap<String, Value>,
}

impl From<Config> for FixConfig {
    fn from(config: Config) -> FixConfig {
        FixConfig {
            llm: config.llm,
            validation: config.validation,
        }
    }
}

/// Prints out a warning message for every field in `unknown`.
pub fn unknown_field_warning(unknown: &HashMap<String, Value>) {
    let mut entries: Vec<_> = unknown.keys().collect();
    entries.sort_unstable();
    entries
        .into_iter()
        .for_each(|name| warn!("unknown config key {name}"));
}

/// Builds the configuration from (lowest to highest precedence) the built-in defaults, the user's
/// config file, `./mend.toml`, and `--config` arguments.
pub fn load_config(args: &Args, config_dir: &Path) -> Result<Config, ConfigError> {
    let mut settings = config::Config::builder()
        .add_source(config::File::from_str(
            include_str!("../default_config.toml"),
            Toml,
        ))
        .add_source(config::File::from(config_file(config_dir)).required(false))
        .add_source(config::File::from(PathBuf::from("mend.toml")).required(false));
    for config_arg in &args.config {
        let Some((name, value)) = config_arg.split_once('=') else {
            return Err(ConfigError::Message(format!(
                "failed to parse config value {config_arg:?}; no '=' found"
            )));
        };
        settings = settings.set_override(name, value)?;
    }
    settings.build()?.try_deserialize()
}

/// Returns the config file path, given the config directory.
pub fn config_file(config_dir: &Path) -> PathBuf {
    [config_dir, "mend.toml".as_ref()].iter().collect()
}
