//! Timestamped backups and in-place rewrites

use crate::FixError;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Returns `<path>.<YYYYMMDDHHMMSS>.bak`.
pub fn backup_path(path: &Path, timestamp: &DateTime<Local>) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.bak", timestamp.format("%Y%m%d%H%M%S")));
    PathBuf::from(name)
}

/// Moves `path` aside to a fresh timestamped backup and returns the backup's path.
pub fn backup_file(path: &Path) -> Result<PathBuf, FixError> {
    let backup = backup_path(path, &Local::now());
    move_to_backup(path, &backup)?;
    Ok(backup)
}

/// Moves `path` to `backup`.
///
/// Never overwrites an existing file at `backup`: the backup is created as a hard link, which
/// fails atomically if the name is taken. On error the original file is left where it was.
pub fn move_to_backup(path: &Path, backup: &Path) -> Result<(), FixError> {
    let failed = |source| FixError::Backup {
        path: path.to_path_buf(),
        backup: backup.to_path_buf(),
        source,
    };
    fs::hard_link(path, backup).map_err(failed)?;
    if let Err(e) = fs::remove_file(path) {
        let _ = fs::remove_file(backup);
        return Err(failed(e));
    }
    debug!("Moved {} to {}", path.display(), backup.display());
    Ok(())
}

/// Writes `content` to `path` (mode 0644 on unix). `backup` is only used for error reporting.
pub fn write_fixed(path: &Path, content: &str, backup: &Path) -> Result<(), FixError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options
        .open(path)
        .and_then(|mut file| file.write_all(content.as_bytes()))
        .map_err(|source| FixError::Write {
            path: path.to_path_buf(),
            backup: backup.to_path_buf(),
            source,
        })?;
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
