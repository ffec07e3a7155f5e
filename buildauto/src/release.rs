//! Release archive assembly.
//!
//! Sequence: run the vendor bundle script, copy its zip into the project root,
//! unpack it, rename the unpacked directory to the local naming scheme, inject
//! each module's freshly built jar under a versioned name, and zip the result
//! with paths junked. Any failing step aborts; nothing is rolled back.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;
use zip::write::FileOptions;

use crate::core::release_layout::{ReleaseLayout, module_jar_name};
use crate::core::types::PreconditionError;
use crate::io::build_tool::{CommandRunner, Invocation};
use crate::io::config::ReleaseConfig;

pub const VERSION_ENV: &str = "VERSION";
pub const REVISION_ENV: &str = "REVISION";

/// Version identifiers for one release, resolved before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersions {
    pub version: String,
    pub revision: String,
    /// `(module, upload version)` in layout order.
    pub modules: Vec<(String, String)>,
}

impl ReleaseVersions {
    /// Resolve every identifier through `lookup`, reporting all missing variables at once.
    pub fn resolve(
        layout: &ReleaseLayout,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut missing = BTreeSet::new();
        let mut get = |name: &str| match lookup(name) {
            Some(value) if !value.is_empty() => value,
            _ => {
                missing.insert(name.to_string());
                String::new()
            }
        };

        let version = get(VERSION_ENV);
        let revision = get(REVISION_ENV);
        let modules = layout
            .modules
            .iter()
            .map(|module| (module.clone(), get(layout.version_env_for(module))))
            .collect();

        if !missing.is_empty() {
            let names: Vec<String> = missing.into_iter().collect();
            bail!("missing environment variables: {}", names.join(", "));
        }
        Ok(Self {
            version,
            revision,
            modules,
        })
    }

    pub fn from_env(layout: &ReleaseLayout) -> Result<Self> {
        Self::resolve(layout, |name| std::env::var(name).ok())
    }
}

/// Paths produced by a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseArtifact {
    pub dir: PathBuf,
    pub zip: PathBuf,
}

pub struct ReleaseAssembler<'a, R: CommandRunner> {
    root: PathBuf,
    config: &'a ReleaseConfig,
    runner: &'a R,
}

impl<'a, R: CommandRunner> ReleaseAssembler<'a, R> {
    pub fn new(root: impl Into<PathBuf>, config: &'a ReleaseConfig, runner: &'a R) -> Self {
        Self {
            root: root.into(),
            config,
            runner,
        }
    }

    #[instrument(skip_all, fields(version = %versions.version, revision = %versions.revision))]
    pub fn assemble(&self, versions: &ReleaseVersions) -> Result<ReleaseArtifact> {
        let layout = &self.config.layout;

        self.run_vendor_script()?;

        let vendor_zip_name = layout.vendor_zip_name(&versions.version);
        let vendor_out = self.root.join(&self.config.vendor_output_dir);
        let vendor_zip = vendor_out.join(&vendor_zip_name);
        if !vendor_zip.is_file() {
            return Err(PreconditionError {
                dir: vendor_out,
                missing: vec![vendor_zip_name],
            }
            .into());
        }
        let local_copy = self.root.join(&vendor_zip_name);
        fs::copy(&vendor_zip, &local_copy).with_context(|| {
            format!("copy {} to {}", vendor_zip.display(), local_copy.display())
        })?;

        extract_zip(&local_copy, &self.root)?;

        let vendor_dir = self.root.join(layout.vendor_dir_name(&versions.version));
        let local_dir = self.root.join(layout.local_dir_name(&versions.revision));
        if local_dir.exists() {
            bail!(
                "{} already exists; remove it before assembling",
                local_dir.display()
            );
        }
        info!(from = %vendor_dir.display(), to = %local_dir.display(), "renaming bundle");
        fs::rename(&vendor_dir, &local_dir).with_context(|| {
            format!("rename {} to {}", vendor_dir.display(), local_dir.display())
        })?;

        for (module, version) in &versions.modules {
            let src = self
                .root
                .join(&self.config.libraries_dir)
                .join(module)
                .join(&self.config.module_jar);
            let dest = local_dir.join(module_jar_name(module, version));
            info!(src = %src.display(), dest = %dest.display(), "copying module jar");
            fs::copy(&src, &dest)
                .with_context(|| format!("copy {} to {}", src.display(), dest.display()))?;
        }

        let zip_path = self.root.join(layout.local_zip_name(&versions.revision));
        write_junked_zip(&local_dir, &zip_path)?;
        info!(zip = %zip_path.display(), "release archive written");
        Ok(ReleaseArtifact {
            dir: local_dir,
            zip: zip_path,
        })
    }

    fn run_vendor_script(&self) -> Result<()> {
        let workdir = self.root.join(&self.config.script_dir);
        let script = &self.config.script;
        let program = if script.contains('/') && Path::new(script).is_relative() {
            workdir.join(script).display().to_string()
        } else {
            script.clone()
        };
        let invocation = Invocation::new(program, Vec::new(), workdir);
        self.runner
            .run(&invocation)?
            .check(&invocation)
            .context("vendor bundle script")?;
        Ok(())
    }
}

/// Unpack `archive` into `dest`.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    debug!(archive = %archive.display(), dest = %dest.display(), "extracting");
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    let mut zip =
        zip::ZipArchive::new(file).with_context(|| format!("read zip {}", archive.display()))?;
    zip.extract(dest)
        .with_context(|| format!("extract {} into {}", archive.display(), dest.display()))?;
    Ok(())
}

/// Zip every file under `dir` into `out`, keeping only file names.
///
/// Two files sharing a name would collide once paths are junked; that is an error.
pub fn write_junked_zip(dir: &Path, out: &Path) -> Result<()> {
    let file = File::create(out).with_context(|| format!("create {}", out.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut seen = BTreeSet::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !seen.insert(name.clone()) {
            return Err(anyhow!(
                "cannot repeat name {name} in {} (paths are junked)",
                out.display()
            ));
        }
        debug!(entry = %name, "adding");
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("start zip entry {name}"))?;
        let mut src = File::open(entry.path())
            .with_context(|| format!("open {}", entry.path().display()))?;
        io::copy(&mut src, &mut zip).with_context(|| format!("write zip entry {name}"))?;
    }

    let mut file = zip.finish().with_context(|| format!("finish {}", out.display()))?;
    file.flush().with_context(|| format!("flush {}", out.display()))?;
    Ok(())
}
