//! Applying a confirmed fix to disk

use crate::backup::{backup_file, write_fixed};
use crate::compiler::{BuildResult, ValidationConfig, check_file};
use crate::confirm::Confirm;
use crate::report::Report;
use crate::{FixError, FixResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A fix that was written to disk.
#[derive(Debug)]
pub struct AppliedFix {
    /// Where the original content was moved.
    pub backup: PathBuf,
    /// Output of the check build, if the fix was compiled.
    pub validation: Option<BuildResult>,
}

/// Shows `fix`, asks `confirm`, and if accepted replaces `path` with the fixed code.
///
/// Declining leaves the filesystem untouched. Once accepted, the original is moved to a
/// timestamped backup before anything is written. A failed check build is reported as an error,
/// but the fixed file stays in place; the backup is the way back.
pub fn confirm_and_apply(
    path: &Path,
    fix: &FixResult,
    confirm: &mut dyn Confirm,
    validation: &ValidationConfig,
) -> Result<AppliedFix, FixError> {
    println!("{}", Report(fix));

    let question = format!("Apply the fix to {}?", path.display());
    if !confirm.confirm(&question).map_err(FixError::Prompt)? {
        return Err(FixError::UserCancelled(path.to_path_buf()));
    }

    let backup = backup_file(path)?;
    info!("Original saved to {}", backup.display());
    write_fixed(path, &fix.fixed_code, &backup)?;
    info!("Wrote fixed code to {}", path.display());

    if !validation.applies_to(&fix.language, path) {
        debug!("No check build for {} ({})", path.display(), fix.language);
        return Ok(AppliedFix {
            backup,
            validation: None,
        });
    }

    info!("Checking that {} compiles", path.display());
    let result = match check_file(validation, path) {
        Ok(result) => result,
        Err(e) => {
            return Err(FixError::BuildValidation {
                backup,
                output: format!("failed to run {}: {e}", validation.command),
            });
        }
    };
    if !result.success {
        return Err(FixError::BuildValidation {
            backup,
            output: result.combined_output,
        });
    }
    Ok(AppliedFix {
        backup,
        validation: Some(result),
    })
}
