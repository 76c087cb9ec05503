//! Check-only compilation of a fixed file

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::{debug, trace};

/// Which fixes get compiled, and how.
///
/// `args` may contain the placeholders `{file}` (the fixed file) and `{out_dir}` (a private
/// temporary directory for compiler output, removed afterwards).
#[derive(Clone, Debug, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub language: String,
    pub extension: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            enabled: true,
            language: "rust".into(),
            extension: "rs".into(),
            command: "rustc".into(),
            args: [
                "--edition",
                "2021",
                "--crate-type",
                "lib",
                "--emit=metadata",
                "--out-dir",
                "{out_dir}",
                "{file}",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl ValidationConfig {
    /// True if a fix reported as `language` for `path` should be compiled.
    pub fn applies_to(&self, language: &str, path: &Path) -> bool {
        self.enabled
            && language.trim().eq_ignore_ascii_case(&self.language)
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}

/// Result of a check build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub error_count: usize,
    pub warning_count: usize,
    pub combined_output: String,
}

/// Runs the configured compiler against `path` without producing a binary.
pub fn check_file(config: &ValidationConfig, path: &Path) -> io::Result<BuildResult> {
    let out_dir = tempfile::Builder::new().prefix("mend-check").tempdir()?;
    let file = path.to_string_lossy();
    let out = out_dir.path().to_string_lossy();
    let args: Vec<String> = config
        .args
        .iter()
        .map(|a| a.replace("{file}", &file).replace("{out_dir}", &out))
        .collect();
    debug!("Checking {} with {} {:?}", path.display(), config.command, args);

    let output = Command::new(&config.command).args(&args).output()?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let combined_output = format!("{}\n{}", stdout, stderr);

    trace!("Build output:\n{}", combined_output);

    let error_count = combined_output.matches("error:").count()
        + combined_output.matches("error[").count();
    let warning_count = combined_output.matches("warning:").count();

    Ok(BuildResult {
        success: output.status.success(),
        stdout,
        stderr,
        error_count,
        warning_count,
        combined_output,
    })
}
