//! Build, clean and publish operations over a project root.
//!
//! The driver owns no global state: the tracked file set, mode tokens and
//! build tool command line all come from the [`ProjectConfig`] it is given.
//! Failures come back as errors (see [`BuildFailure`]); turning one into a
//! process exit is left to the binary.
//!
//! [`BuildFailure`]: crate::core::types::BuildFailure

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::mode::{DetectedMode, Mode, detect_mode};
use crate::core::types::RestoreReport;
use crate::io::backup::{restore_files, sidecar_path};
use crate::io::build_tool::{BuildOutcome, CommandRunner, Invocation};
use crate::io::config::{ProjectConfig, resolve_all};
use crate::io::preflight::assert_present_in_dir;
use crate::transaction::with_mode;

/// Per-file view reported by `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFileStatus {
    pub path: PathBuf,
    /// `None` when the file does not exist.
    pub mode: Option<DetectedMode>,
    pub has_backup: bool,
}

/// Runs build tool operations for one project root.
pub struct BuildDriver<'a, R: CommandRunner> {
    root: PathBuf,
    config: &'a ProjectConfig,
    runner: &'a R,
}

impl<'a, R: CommandRunner> BuildDriver<'a, R> {
    pub fn new(root: impl Into<PathBuf>, config: &'a ProjectConfig, runner: &'a R) -> Self {
        Self {
            root: root.into(),
            config,
            runner,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        self.config.tracked_paths(&self.root)
    }

    /// Build with all tracked files switched into `mode`.
    ///
    /// Marker files are checked before anything is touched. Tracked files are
    /// restored whether or not the build succeeds.
    #[instrument(skip_all, fields(mode = %mode))]
    pub fn build(&self, mode: Mode) -> Result<BuildOutcome> {
        assert_present_in_dir(&self.root, &self.config.required_markers)?;
        info!("building");
        let outcome = with_mode(self.tracked_paths(), mode, &self.config.tokens, || {
            self.assemble()
        })?;
        info!(exit_code = ?outcome.code, "build succeeded");
        Ok(outcome)
    }

    /// Run the assemble task on the files as they are.
    pub fn assemble(&self) -> Result<BuildOutcome> {
        self.run_checked(self.gradle(self.config.gradle.assemble_args.clone()))
    }

    pub fn clean(&self) -> Result<BuildOutcome> {
        self.run_checked(self.gradle(self.config.gradle.clean_args.clone()))
    }

    /// Publish one library with its upload task.
    #[instrument(skip_all, fields(library = %library))]
    pub fn upload_archives_single_library(&self, library: &str) -> Result<BuildOutcome> {
        let task = format!(":{library}:{}", self.config.gradle.upload_task);
        self.run_checked(self.gradle(vec![task]))
            .with_context(|| format!("upload archives for {library}"))
    }

    /// Full publish sequence: a testing-mode build, then each configured
    /// library in order, wrapping those with artifacts files in an
    /// artifacts-mode transaction over just those files.
    ///
    /// Stops at the first failure; tracked files are restored before the error
    /// is returned.
    #[instrument(skip_all)]
    pub fn upload_archives(&self) -> Result<()> {
        self.build(Mode::Testing)?;
        for target in &self.config.upload {
            if target.artifacts_files.is_empty() {
                self.upload_archives_single_library(&target.library)?;
                continue;
            }
            let files = resolve_all(&self.root, &target.artifacts_files);
            with_mode(files, Mode::Artifacts, &self.config.tokens, || {
                self.upload_archives_single_library(&target.library)
            })?;
        }
        info!(libraries = self.config.upload.len(), "upload complete");
        Ok(())
    }

    /// Restore tracked files from any sidecars left by an interrupted run.
    pub fn restore(&self) -> Result<RestoreReport> {
        restore_files(&self.tracked_paths())
    }

    /// Current mode and backup state of every tracked file.
    pub fn status(&self) -> Result<Vec<TrackedFileStatus>> {
        let mut statuses = Vec::new();
        for path in self.tracked_paths() {
            let mode = if path.exists() {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?;
                Some(detect_mode(&content, &self.config.tokens))
            } else {
                None
            };
            let has_backup = sidecar_path(&path).exists();
            statuses.push(TrackedFileStatus {
                path,
                mode,
                has_backup,
            });
        }
        Ok(statuses)
    }

    /// Build tool invocation with `args`, run from the project root.
    fn gradle(&self, args: Vec<String>) -> Invocation {
        let program = &self.config.gradle.program;
        // A relative path with a separator is relative to the project root, not our cwd.
        let program = if program.contains('/') && Path::new(program).is_relative() {
            self.root.join(program).display().to_string()
        } else {
            program.clone()
        };
        Invocation::new(program, args, self.root.clone())
    }

    fn run_checked(&self, invocation: Invocation) -> Result<BuildOutcome> {
        self.runner.run(&invocation)?.check(&invocation)
    }
}
