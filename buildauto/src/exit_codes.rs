//! Stable exit codes for buildauto commands.
//!
//! A failed external command is the exception: the process exits with that
//! command's own status, after tracked files have been restored.

use crate::core::types::BuildFailure;

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config, missing marker files, stale backups, I/O errors, or a build
/// tool killed without an exit status.
pub const INVALID: i32 = 1;

/// Exit code the binary should terminate with for `err`.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BuildFailure>() {
        Some(BuildFailure {
            code: Some(code), ..
        }) if *code != OK => *code,
        _ => INVALID,
    }
}
