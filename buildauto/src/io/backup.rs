//! Sidecar backups and in-place mode rewrites for tracked files.
//!
//! A sidecar `<file>.bak` exists exactly while `<file>` may differ from its
//! pre-mutation content.

use std::borrow::Cow;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::core::mode::ModeSubstitution;
use crate::core::types::RestoreReport;

pub const SIDECAR_SUFFIX: &str = ".bak";

/// `<path>.bak`, appended to the full file name.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(SIDECAR_SUFFIX);
    PathBuf::from(raw)
}

pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let dest = sidecar_path(path);
    info!(src = %path.display(), dest = %dest.display(), "backing up");
    fs::copy(path, &dest)
        .with_context(|| format!("copy {} to {}", path.display(), dest.display()))?;
    Ok(dest)
}

pub fn backup_files(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        backup_file(path)?;
    }
    Ok(())
}

/// Sidecars that currently exist for `paths`.
pub fn existing_sidecars(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| sidecar_path(p))
        .filter(|p| p.exists())
        .collect()
}

/// Rewrite `path` in place with `substitution`, returning the number of replacements.
///
/// A sidecar is created first when none exists, so the file can always be
/// restored. An existing sidecar is left alone: it already holds the
/// pre-mutation content.
#[instrument(skip_all, fields(path = %path.display(), mode = %substitution.mode()))]
pub fn apply_mode_to_file(path: &Path, substitution: &ModeSubstitution) -> Result<usize> {
    if !sidecar_path(path).exists() {
        backup_file(path)?;
    }
    info!("setting {} to {} mode", path.display(), substitution.mode());
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let replaced = substitution.count(&content);
    if let Cow::Owned(updated) = substitution.apply(&content) {
        fs::write(path, updated).with_context(|| format!("write {}", path.display()))?;
    }
    debug!(replaced, "mode applied");
    Ok(replaced)
}

/// Copy the sidecar back over `path` and delete it.
///
/// Returns `false` (and logs) when there is no sidecar to restore from.
pub fn restore_file(path: &Path) -> Result<bool> {
    let src = sidecar_path(path);
    if !src.exists() {
        warn!(file = %src.display(), "cannot find backup, not restoring");
        return Ok(false);
    }
    info!(src = %src.display(), dest = %path.display(), "restoring");
    fs::copy(&src, path)
        .with_context(|| format!("copy {} to {}", src.display(), path.display()))?;
    fs::remove_file(&src).with_context(|| format!("remove {}", src.display()))?;
    Ok(true)
}

/// Restore every file that has a sidecar.
///
/// A failure on one file does not stop the others. Errors are logged as they
/// happen and the first one is returned once every file has been tried.
pub fn restore_files(paths: &[PathBuf]) -> Result<RestoreReport> {
    let mut report = RestoreReport::default();
    let mut failures = Vec::new();
    for path in paths {
        match restore_file(path) {
            Ok(true) => report.restored.push(path.clone()),
            Ok(false) => report.missing_backup.push(path.clone()),
            Err(err) => {
                error!(file = %path.display(), err = %format!("{err:#}"), "restore failed");
                failures.push(err);
            }
        }
    }
    let failed = failures.len();
    match failures.into_iter().next() {
        None => Ok(report),
        Some(first) => Err(first.context(format!(
            "failed to restore {failed} of {} tracked files",
            paths.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mode::{Mode, ModeTokens};

    #[test]
    fn sidecar_appends_to_full_name() {
        assert_eq!(
            sidecar_path(Path::new("libs/a/build.gradle")),
            PathBuf::from("libs/a/build.gradle.bak")
        );
    }

    #[test]
    fn backup_then_restore_removes_sidecar() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("build.gradle");
        fs::write(&file, "original").expect("write");

        backup_file(&file).expect("backup");
        fs::write(&file, "mutated").expect("mutate");
        assert!(restore_file(&file).expect("restore"));

        assert_eq!(fs::read_to_string(&file).expect("read"), "original");
        assert!(!sidecar_path(&file).exists());
    }

    #[test]
    fn backup_of_missing_file_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = backup_file(&temp.path().join("nope.gradle")).unwrap_err();
        assert!(format!("{err:#}").contains("nope.gradle"));
    }

    #[test]
    fn restore_continues_past_a_failing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let broken = temp.path().join("broken.gradle");
        let fine = temp.path().join("fine.gradle");
        fs::write(&broken, "mutated").expect("write broken");
        fs::create_dir(sidecar_path(&broken)).expect("sidecar dir");
        fs::write(&fine, "original").expect("write fine");
        backup_file(&fine).expect("backup");
        fs::write(&fine, "mutated").expect("mutate");

        let err = restore_files(&[broken, fine.clone()]).unwrap_err();

        assert!(format!("{err:#}").contains("failed to restore 1 of 2"));
        assert_eq!(fs::read_to_string(&fine).expect("read"), "original");
        assert!(!sidecar_path(&fine).exists());
    }

    #[test]
    fn restore_without_sidecar_is_tolerated() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("build.gradle");
        fs::write(&file, "untouched").expect("write");

        let report = restore_files(std::slice::from_ref(&file)).expect("restore");
        assert!(report.restored.is_empty());
        assert_eq!(report.missing_backup, vec![file.clone()]);
        assert_eq!(fs::read_to_string(&file).expect("read"), "untouched");
    }

    #[test]
    fn apply_mode_backs_up_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("build.gradle");
        let original = "apply from: 'dependencies-archive.gradle'\n";
        fs::write(&file, original).expect("write");
        let tokens = ModeTokens::default();

        let testing = ModeSubstitution::new(Mode::Testing, &tokens).expect("testing");
        assert_eq!(apply_mode_to_file(&file, &testing).expect("apply"), 1);
        let artifacts = ModeSubstitution::new(Mode::Artifacts, &tokens).expect("artifacts");
        apply_mode_to_file(&file, &artifacts).expect("apply");
        fs::write(&file, "scribbled").expect("scribble");

        let sidecar = fs::read_to_string(sidecar_path(&file)).expect("sidecar");
        assert_eq!(sidecar, original);
        restore_file(&file).expect("restore");
        assert_eq!(fs::read_to_string(&file).expect("read"), original);
    }

    #[test]
    fn existing_sidecars_lists_only_present() {
        let temp = tempfile::tempdir().expect("tempdir");
        let a = temp.path().join("a.gradle");
        let b = temp.path().join("b.gradle");
        fs::write(&a, "a").expect("write");
        fs::write(&b, "b").expect("write");
        backup_file(&b).expect("backup");

        assert_eq!(existing_sidecars(&[a, b.clone()]), vec![sidecar_path(&b)]);
    }
}
