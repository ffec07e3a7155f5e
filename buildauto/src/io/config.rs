//! Project configuration stored in `buildauto.toml` at the project root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::mode::ModeTokens;
use crate::core::release_layout::ReleaseLayout;

pub const CONFIG_FILE_NAME: &str = "buildauto.toml";

/// Project configuration (TOML).
///
/// Everything that used to be a process-wide constant lives here and is passed
/// into the driver explicitly. Missing fields default to the values of the
/// project this tool was written for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Mode-sensitive files, relative to the project root, in processing order.
    pub tracked_files: Vec<String>,

    /// Entries that must exist in the project root before any build.
    pub required_markers: Vec<String>,

    /// Keep at most this many bytes of each child stream in memory.
    pub output_limit_bytes: usize,

    pub tokens: ModeTokens,

    pub gradle: GradleConfig,

    /// Libraries published by `buildauto upload`, in order.
    pub upload: Vec<UploadTarget>,

    pub release: ReleaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GradleConfig {
    /// Build tool executable, resolved relative to the project root when it has a path.
    pub program: String,
    pub clean_args: Vec<String>,
    pub assemble_args: Vec<String>,
    /// Task run as `:<library>:<upload_task>`.
    pub upload_task: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadTarget {
    /// Library path as passed to the build tool.
    pub library: String,
    /// Files switched to artifacts mode for the duration of this publish.
    #[serde(default)]
    pub artifacts_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Directory the vendor bundle script runs in.
    pub script_dir: String,
    /// Script producing the vendor zip, relative to `script_dir`.
    pub script: String,
    /// Where the vendor zip lands.
    pub vendor_output_dir: String,
    /// Directory holding one subdirectory per module.
    pub libraries_dir: String,
    /// Built jar inside each module directory.
    pub module_jar: String,
    pub layout: ReleaseLayout,
}

impl Default for GradleConfig {
    fn default() -> Self {
        Self {
            program: "./gradlew".to_string(),
            clean_args: vec!["clean".to_string()],
            assemble_args: vec!["assemble".to_string()],
            upload_task: "uploadArchivesWrapper".to_string(),
        }
    }
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            script_dir: "release".to_string(),
            script: "./zip_jars.sh".to_string(),
            vendor_output_dir: "release/target".to_string(),
            libraries_dir: "libraries".to_string(),
            module_jar: "build/bundles/release/classes.jar".to_string(),
            layout: ReleaseLayout::default(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            tracked_files: vec![
                "libraries/couchbase-lite-android/build.gradle".to_string(),
                "libraries/couchbase-lite-java-javascript/build.gradle".to_string(),
                "build.gradle".to_string(),
            ],
            required_markers: vec!["settings.gradle".to_string()],
            output_limit_bytes: 10_000_000,
            tokens: ModeTokens::default(),
            gradle: GradleConfig::default(),
            upload: vec![
                UploadTarget {
                    library: "libraries/couchbase-lite-android".to_string(),
                    artifacts_files: Vec::new(),
                },
                UploadTarget {
                    library: "libraries/couchbase-lite-java-javascript".to_string(),
                    artifacts_files: vec![
                        "libraries/couchbase-lite-java-javascript/build.gradle".to_string(),
                    ],
                },
            ],
            release: ReleaseConfig::default(),
        }
    }
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tracked_files.is_empty() {
            return Err(anyhow!("tracked_files must not be empty"));
        }
        if self.tracked_files.iter().any(|f| f.trim().is_empty()) {
            return Err(anyhow!("tracked_files entries must be non-empty"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        self.tokens.validate()?;
        if self.gradle.program.trim().is_empty() {
            return Err(anyhow!("gradle.program must be non-empty"));
        }
        if self.gradle.upload_task.trim().is_empty() {
            return Err(anyhow!("gradle.upload_task must be non-empty"));
        }
        for target in &self.upload {
            if target.library.trim().is_empty() {
                return Err(anyhow!("upload.library must be non-empty"));
            }
        }
        Ok(())
    }

    /// Tracked files resolved against `root`.
    pub fn tracked_paths(&self, root: &Path) -> Vec<PathBuf> {
        resolve_all(root, &self.tracked_files)
    }
}

pub fn resolve_all(root: &Path, relative: &[String]) -> Vec<PathBuf> {
    relative.iter().map(|f| root.join(f)).collect()
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ProjectConfig::default()`.
pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    if !path.exists() {
        let cfg = ProjectConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ProjectConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ProjectConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
