//! Test-only helpers: a throwaway project tree and a scripted command runner.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::io::backup::existing_sidecars;
use crate::io::build_tool::{BuildOutcome, CommandRunner, Invocation};
use crate::io::config::{CONFIG_FILE_NAME, ProjectConfig, UploadTarget, write_config};

pub const CORE_GRADLE: &str = "apply plugin: 'android-library'\n\
    apply from: 'dependencies-archive.gradle'\n";
pub const JS_GRADLE: &str = "apply plugin: 'java'\n\
    apply from: 'dependencies-test.gradle'\n";
pub const ROOT_GRADLE: &str = "buildscript {\n    apply from: 'dependencies-archive.gradle'\n}\n";

/// A temporary project with a marker file and three tracked build files.
///
/// Layout:
/// ```text
/// settings.gradle
/// build.gradle                  (archive token)
/// libraries/core/build.gradle   (archive token)
/// libraries/js/build.gradle     (test token)
/// ```
pub struct TestProject {
    temp: TempDir,
    pub config: ProjectConfig,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("tempdir")?;
        let root = temp.path();
        fs::create_dir_all(root.join("libraries/core")).context("create core dir")?;
        fs::create_dir_all(root.join("libraries/js")).context("create js dir")?;
        fs::write(root.join("settings.gradle"), "include ':libraries:core'\n")
            .context("write settings.gradle")?;
        fs::write(root.join("libraries/core/build.gradle"), CORE_GRADLE)
            .context("write core build.gradle")?;
        fs::write(root.join("libraries/js/build.gradle"), JS_GRADLE)
            .context("write js build.gradle")?;
        fs::write(root.join("build.gradle"), ROOT_GRADLE).context("write build.gradle")?;

        let config = ProjectConfig {
            tracked_files: vec![
                "libraries/core/build.gradle".to_string(),
                "libraries/js/build.gradle".to_string(),
                "build.gradle".to_string(),
            ],
            upload: vec![
                UploadTarget {
                    library: "libraries/core".to_string(),
                    artifacts_files: Vec::new(),
                },
                UploadTarget {
                    library: "libraries/js".to_string(),
                    artifacts_files: vec!["libraries/js/build.gradle".to_string()],
                },
            ],
            ..ProjectConfig::default()
        };
        Ok(Self { temp, config })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        self.config.tracked_paths(self.root())
    }

    /// Bytes of every tracked file, in tracked order.
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        self.tracked_paths()
            .iter()
            .map(|p| fs::read(p).unwrap_or_else(|e| panic!("read {}: {e}", p.display())))
            .collect()
    }

    pub fn snapshot_strings(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .map(|b| String::from_utf8(b).expect("utf8"))
            .collect()
    }

    /// Sidecars currently present for tracked files.
    pub fn sidecars(&self) -> Vec<PathBuf> {
        existing_sidecars(&self.tracked_paths())
    }

    /// Persist `self.config` as `buildauto.toml` in the project root.
    pub fn write_config(&self) -> Result<PathBuf> {
        let path = self.root().join(CONFIG_FILE_NAME);
        write_config(&path, &self.config)?;
        Ok(path)
    }

    /// Install an executable `gradlew` shell script running `body`.
    #[cfg(unix)]
    pub fn write_gradle_stub(&self, body: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root().join("gradlew");
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))
            .with_context(|| format!("write {}", path.display()))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("chmod {}", path.display()))?;
        Ok(path)
    }
}

/// Command runner that replays exit codes in order and records what it saw.
pub struct ScriptedRunner {
    codes: RefCell<VecDeque<i32>>,
    invocations: RefCell<Vec<Invocation>>,
    watch: Vec<PathBuf>,
    observed: RefCell<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new(codes: Vec<i32>) -> Self {
        Self {
            codes: RefCell::new(codes.into()),
            invocations: RefCell::new(Vec::new()),
            watch: Vec::new(),
            observed: RefCell::new(Vec::new()),
        }
    }

    /// Also capture the content of `paths` at the moment each command runs.
    pub fn observing(mut self, paths: Vec<PathBuf>) -> Self {
        self.watch = paths;
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    pub fn observed(&self) -> Vec<Vec<String>> {
        self.observed.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<BuildOutcome> {
        self.invocations.borrow_mut().push(invocation.clone());
        if !self.watch.is_empty() {
            let contents = self
                .watch
                .iter()
                .map(|p| fs::read_to_string(p).unwrap_or_default())
                .collect();
            self.observed.borrow_mut().push(contents);
        }
        let code = self
            .codes
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted runner exhausted at `{}`", invocation.display()))?;
        Ok(BuildOutcome {
            code: Some(code),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}
