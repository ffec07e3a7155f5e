//! Shared types for buildauto operations.
//!
//! The error structs travel inside `anyhow::Error` and are recovered with
//! `downcast_ref` at the point where an exit code is chosen.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Required marker files were absent; nothing was mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconditionError {
    pub dir: PathBuf,
    pub missing: Vec<String>,
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "did not find all of [{}] in {}",
            self.missing.join(", "),
            self.dir.display()
        )
    }
}

impl Error for PreconditionError {}

/// Backup sidecars from an interrupted run already exist.
///
/// Opening a new transaction over them would overwrite the only pristine copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleBackupError {
    pub sidecars: Vec<PathBuf>,
}

impl fmt::Display for StaleBackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<String> = self
            .sidecars
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        write!(
            f,
            "stale backups present (run `buildauto restore` first): {}",
            paths.join(", ")
        )
    }
}

impl Error for StaleBackupError {}

/// An external build command exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    /// Rendered command line, for messages.
    pub command: String,
    /// Child exit status; `None` when it was terminated by a signal.
    pub code: Option<i32>,
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "`{}` failed with exit status {code}", self.command),
            None => write!(f, "`{}` was terminated by a signal", self.command),
        }
    }
}

impl Error for BuildFailure {}

/// What a restore pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Files copied back from their sidecar.
    pub restored: Vec<PathBuf>,
    /// Files whose sidecar was missing; left untouched.
    pub missing_backup: Vec<PathBuf>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.missing_backup.is_empty()
    }
}
