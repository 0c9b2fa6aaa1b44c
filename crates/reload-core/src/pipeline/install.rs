//! Atomic installation of a data file.
//!
//! Implements the copy as:
//! 1. Write the validated bytes to a uniquely named temp file next to the target
//! 2. Flush and fsync the temp file
//! 3. Optionally copy the previous target to a `.bak` file
//! 4. Atomically rename the temp file onto the target
//!
//! The target is therefore absent, fully old or fully new at any moment. The
//! bytes come from memory, so the source file is never reopened and later
//! changes to it cannot reach the target.

use crate::config::InstallConfig;
use crate::error::{ReloadError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// What an install wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub target: PathBuf,
    pub bytes: u64,
    /// Copy of the replaced target, when backups are enabled.
    pub backup: Option<PathBuf>,
}

/// Copies a validated data file into its install location.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallStep {
    keep_backup: bool,
}

impl InstallStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the replaced target as `<target>.bak`.
    pub fn keep_backup(mut self, enable: bool) -> Self {
        self.keep_backup = enable;
        self
    }

    /// Atomically replace `target` with `contents`, the validated bytes of
    /// `source`.
    pub fn install(&self, contents: &[u8], source: &Path, target: &Path) -> Result<InstallReport> {
        let fail = |message: String, err: Option<io::Error>| ReloadError::Install {
            source_path: source.to_path_buf(),
            target: target.to_path_buf(),
            message,
            source: err,
        };

        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.exists() {
            fs::create_dir_all(&parent).map_err(|e| {
                fail(format!("Failed to create directory {}", parent.display()), Some(e))
            })?;
        }

        if is_same_file(source, target) {
            return Err(fail("source and target are the same file".to_string(), None));
        }

        // Dropping the temp file on any early return removes it.
        let mut temp = tempfile::Builder::new()
            .prefix(InstallConfig::TEMP_PREFIX)
            .suffix(InstallConfig::TEMP_SUFFIX)
            .tempfile_in(&parent)
            .map_err(|e| {
                fail(format!("Failed to create temp file in {}", parent.display()), Some(e))
            })?;

        temp.write_all(contents)
            .map_err(|e| fail(format!("Failed to write {}", temp.path().display()), Some(e)))?;
        let bytes = contents.len() as u64;
        temp.flush()
            .map_err(|e| fail(format!("Failed to flush {}", temp.path().display()), Some(e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| fail(format!("Failed to sync {}", temp.path().display()), Some(e)))?;

        let backup = if self.keep_backup && target.exists() {
            backup_previous(target)
        } else {
            None
        };

        persist(temp, target).map_err(|e| {
            fail(format!("Failed to rename into {}", target.display()), Some(e))
        })?;
        sync_dir(&parent);

        info!(
            source = %source.display(),
            target = %target.display(),
            bytes,
            "Installed data file"
        );
        Ok(InstallReport {
            target: target.to_path_buf(),
            bytes,
            backup,
        })
    }
}

fn persist(temp: NamedTempFile, target: &Path) -> io::Result<()> {
    temp.persist(target).map(drop).map_err(|e| e.error)
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".");
    name.push(InstallConfig::BACKUP_EXTENSION);
    PathBuf::from(name)
}

/// Backup failure is not fatal; the install still proceeds.
fn backup_previous(target: &Path) -> Option<PathBuf> {
    let backup = backup_path(target);
    match fs::copy(target, &backup) {
        Ok(_) => {
            debug!("Created backup: {}", backup.display());
            Some(backup)
        }
        Err(e) => {
            warn!("Failed to create backup {}: {}", backup.display(), e);
            None
        }
    }
}

fn is_same_file(source: &Path, target: &Path) -> bool {
    match (source.canonicalize(), target.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Make the rename durable. Not every platform can open a directory.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        debug!("Failed to sync directory {}: {}", dir.display(), e);
    }
    #[cfg(not(unix))]
    let _ = dir;
}
