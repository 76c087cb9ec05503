//! Single-file bug fixing with a local LLM
//!
//! This tool fixes one source file by:
//! 1. Checking that the inference server is reachable
//! 2. Asking the model for a structured fix of the whole file
//! 3. Showing the fix and asking for confirmation
//! 4. Moving the original to a timestamped backup and writing the fix in its place
//! 5. Compiling the result in check-only mode, for the configured language

pub mod backup;
pub mod compiler;
pub mod confirm;
pub mod file_fixer;
pub mod report;
pub mod updater;

#[cfg(test)]
mod tests;

use mend_core::llm::{InferenceClient, LLMConfig, LLMError};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub use compiler::{BuildResult, ValidationConfig, check_file};
pub use confirm::{AssumeYes, Confirm, PromptConfirm};
pub use file_fixer::{FixResult, build_fix_request, fix_schema, request_fix};
pub use updater::{AppliedFix, confirm_and_apply};

/// Configuration for the fix tool
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FixConfig {
    #[serde(default)]
    pub llm: LLMConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Everything that can stop a fix. None of these are retried.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("inference server at {0} is not reachable")]
    ServerUnreachable(String),
    #[error("failed to read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is empty, nothing to fix", .0.display())]
    EmptyFile(PathBuf),
    #[error("fix request failed: {0}")]
    Request(#[source] LLMError),
    #[error("could not parse the model's fix: {0}")]
    ResponseParse(String),
    #[error("fix cancelled, {} left unchanged", .0.display())]
    UserCancelled(PathBuf),
    #[error("failed to read confirmation: {0}")]
    Prompt(#[source] io::Error),
    #[error("failed to back up {} to {}: {source}", .path.display(), .backup.display())]
    Backup {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {} (original saved at {}): {source}", .path.display(), .backup.display())]
    Write {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("fixed file does not compile (original saved at {}):\n{output}", .backup.display())]
    BuildValidation { backup: PathBuf, output: String },
}

impl FixError {
    /// Process exit code for this error. Declining a fix is not a failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            FixError::UserCancelled(_) => 0,
            _ => 1,
        }
    }
}

/// Reads `path`, asks the model for a fix, and applies it if `confirm` agrees.
pub fn run_fix(
    path: &Path,
    config: &FixConfig,
    confirm: &mut dyn Confirm,
) -> Result<AppliedFix, FixError> {
    let source = std::fs::read_to_string(path).map_err(|source| FixError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    if source.trim().is_empty() {
        return Err(FixError::EmptyFile(path.to_path_buf()));
    }

    let client = InferenceClient::new(&config.llm).map_err(FixError::Request)?;
    if !client.check_reachable() {
        return Err(FixError::ServerUnreachable(config.llm.address.clone()));
    }

    info!(
        "Asking {} at {} to fix {}",
        config.llm.model,
        config.llm.address,
        path.display()
    );
    let fix = request_fix(&client, &config.llm, &source)?;
    info!("Model reports a {} bug in {} code", fix.error_type, fix.language);

    confirm_and_apply(path, &fix, confirm, &config.validation)
}
