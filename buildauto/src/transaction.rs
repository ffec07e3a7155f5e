//! Scoped backup/mutate/restore of tracked files.
//!
//! [`ModeTransaction::begin`] backs up and rewrites a set of files. The files
//! are restored from their sidecars when the transaction is finished or, on
//! any other exit path (early `?`, panic unwinding), when it is dropped.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::core::mode::{Mode, ModeSubstitution, ModeTokens};
use crate::core::types::{RestoreReport, StaleBackupError};
use crate::io::backup::{apply_mode_to_file, backup_files, existing_sidecars, restore_files};

/// Guard over a set of files currently rewritten into a mode.
#[derive(Debug)]
pub struct ModeTransaction {
    files: Vec<PathBuf>,
    mode: Mode,
    active: bool,
}

impl ModeTransaction {
    /// Back up `files`, then rewrite each into `mode`.
    ///
    /// Refuses to start if any sidecar already exists. If backup or rewriting
    /// fails part way, whatever was backed up is restored before returning.
    pub fn begin(files: Vec<PathBuf>, mode: Mode, tokens: &ModeTokens) -> Result<Self> {
        let stale = existing_sidecars(&files);
        if !stale.is_empty() {
            return Err(StaleBackupError { sidecars: stale }.into());
        }
        let substitution = ModeSubstitution::new(mode, tokens)?;

        let tx = Self {
            files,
            mode,
            active: true,
        };
        backup_files(&tx.files)?;
        for file in &tx.files {
            apply_mode_to_file(file, &substitution)?;
        }
        info!(mode = %mode, files = tx.files.len(), "mode applied");
        Ok(tx)
    }

    /// Restore every file now, surfacing I/O errors. Drop becomes a no-op.
    pub fn finish(mut self) -> Result<RestoreReport> {
        self.active = false;
        let report = restore_files(&self.files)?;
        log_report(&report);
        Ok(report)
    }
}

impl Drop for ModeTransaction {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        debug!(mode = %self.mode, "restoring tracked files on drop");
        match restore_files(&self.files) {
            Ok(report) => log_report(&report),
            // Nothing can be propagated from Drop.
            Err(err) => error!(err = %format!("{err:#}"), "restore failed"),
        }
    }
}

fn log_report(report: &RestoreReport) {
    if !report.is_clean() {
        warn!(
            missing = report.missing_backup.len(),
            "some tracked files had no backup to restore"
        );
    }
    debug!(restored = report.restored.len(), "restore complete");
}

/// Run `body` inside a transaction and restore afterwards, whatever `body` returns.
///
/// An error from `body` wins over a restore error; the latter is then only logged.
pub fn with_mode<T>(
    files: Vec<PathBuf>,
    mode: Mode,
    tokens: &ModeTokens,
    body: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let tx = ModeTransaction::begin(files, mode, tokens)?;
    let result = body();
    let restored = tx.finish();
    match (result, restored) {
        (Ok(value), Ok(_)) => Ok(value),
        (Ok(_), Err(restore_err)) => Err(restore_err),
        (Err(err), Ok(_)) => Err(err),
        (Err(err), Err(restore_err)) => {
            error!(err = %format!("{restore_err:#}"), "restore failed after error");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use anyhow::anyhow;

    use super::*;
    use crate::io::backup::sidecar_path;

    fn write_files(dir: &Path) -> Vec<PathBuf> {
        let a = dir.join("a.gradle");
        let b = dir.join("b.gradle");
        fs::write(&a, "apply from: 'dependencies-archive.gradle'\n").expect("write a");
        fs::write(&b, "no tokens here\n").expect("write b");
        vec![a, b]
    }

    fn snapshot(files: &[PathBuf]) -> Vec<Vec<u8>> {
        files.iter().map(|f| fs::read(f).expect("read")).collect()
    }

    #[test]
    fn finish_restores_and_removes_sidecars() {
        let temp = tempfile::tempdir().expect("tempdir");
        let files = write_files(temp.path());
        let before = snapshot(&files);

        let tx = ModeTransaction::begin(files.clone(), Mode::Testing, &ModeTokens::default())
            .expect("begin");
        let during = fs::read_to_string(&files[0]).expect("read");
        assert!(during.contains("dependencies-test.gradle"));

        let report = tx.finish().expect("finish");
        assert_eq!(report.restored.len(), 2);
        assert_eq!(snapshot(&files), before);
        assert!(files.iter().all(|f| !sidecar_path(f).exists()));
    }

    #[test]
    fn drop_restores_on_error_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let files = write_files(temp.path());
        let before = snapshot(&files);

        let result: Result<()> = (|| {
            let _tx = ModeTransaction::begin(files.clone(), Mode::Testing, &ModeTokens::default())?;
            Err(anyhow!("build exploded"))
        })();

        assert!(result.is_err());
        assert_eq!(snapshot(&files), before);
        assert!(files.iter().all(|f| !sidecar_path(f).exists()));
    }

    #[test]
    fn partial_backup_failure_restores_what_was_backed_up() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut files = write_files(temp.path());
        files.push(temp.path().join("missing.gradle"));
        let before = snapshot(&files[..2]);

        let err = ModeTransaction::begin(files.clone(), Mode::Testing, &ModeTokens::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("missing.gradle"));
        assert_eq!(snapshot(&files[..2]), before);
        assert!(files.iter().all(|f| !sidecar_path(f).exists()));
    }

    #[test]
    fn stale_sidecar_blocks_begin_without_touching_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let files = write_files(temp.path());
        fs::write(sidecar_path(&files[0]), "pristine\n").expect("stale");
        let before = snapshot(&files);

        let err = ModeTransaction::begin(files.clone(), Mode::Testing, &ModeTokens::default())
            .unwrap_err();
        assert!(err.downcast_ref::<StaleBackupError>().is_some());
        assert_eq!(snapshot(&files), before);
        assert_eq!(
            fs::read_to_string(sidecar_path(&files[0])).expect("sidecar"),
            "pristine\n"
        );
    }

    #[test]
    fn unrestorable_sidecar_does_not_block_other_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let files: Vec<PathBuf> = ["a.gradle", "b.gradle", "c.gradle"]
            .iter()
            .map(|name| temp.path().join(name))
            .collect();
        for file in &files {
            fs::write(file, "apply from: 'dependencies-archive.gradle'\n").expect("write");
        }
        let before = snapshot(&files);

        let tx = ModeTransaction::begin(files.clone(), Mode::Testing, &ModeTokens::default())
            .expect("begin");
        let blocked = sidecar_path(&files[0]);
        fs::remove_file(&blocked).expect("remove sidecar");
        fs::create_dir(&blocked).expect("sidecar dir");

        let err = tx.finish().unwrap_err();
        assert!(format!("{err:#}").contains("1 of 3"));
        assert_eq!(snapshot(&files[1..]), before[1..]);
        assert!(files[1..].iter().all(|f| !sidecar_path(f).exists()));
    }

    #[test]
    fn with_mode_prefers_body_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let files = write_files(temp.path());
        let before = snapshot(&files);

        let err = with_mode(files.clone(), Mode::Artifacts, &ModeTokens::default(), || {
            Err::<(), _>(anyhow!("body failed"))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "body failed");
        assert_eq!(snapshot(&files), before);
    }
}
