//! Gradle build automation helper.
//!
//! Switches tracked build files between testing and artifacts mode around
//! build tool invocations, always restoring them afterwards. A failed build
//! tool invocation terminates the process with that invocation's exit status.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use buildauto::core::mode::Mode;
use buildauto::driver::BuildDriver;
use buildauto::exit_codes;
use buildauto::io::build_tool::SystemRunner;
use buildauto::io::config::{CONFIG_FILE_NAME, ProjectConfig, load_config, write_config};
use buildauto::logging;
use buildauto::release::{ReleaseAssembler, ReleaseVersions};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "buildauto",
    version,
    about = "Build, test and publish a Gradle project with mode-switched build files"
)]
struct Cli {
    /// Project root containing the marker and tracked files.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Config file [default: <root>/buildauto.toml].
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default `buildauto.toml` if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Switch tracked files into a mode, assemble, and restore them.
    Build {
        #[arg(long, value_enum, default_value_t = ModeArg::Testing)]
        mode: ModeArg,
    },
    /// Run the clean task.
    Clean,
    /// Run the assemble task without touching tracked files.
    Assemble,
    /// Testing-mode build followed by publishing every configured library.
    Upload,
    /// Publish a single library.
    UploadLibrary {
        /// Library path as known to the build tool (e.g. `libraries/core`).
        library: String,
    },
    /// Restore tracked files from backups left by an interrupted run.
    Restore,
    /// Show each tracked file's current mode and backup state.
    Status,
    /// Assemble the release zip from the vendor bundle and built jars.
    ReleaseZip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Testing,
    Artifacts,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Testing => Mode::Testing,
            ModeArg::Artifacts => Mode::Artifacts,
        }
    }
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        // Every transaction has been dropped (and restored) by now.
        std::process::exit(exit_codes::for_error(&err));
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let root = cli.root.as_path();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));

    match cli.command {
        Command::Init { force } => cmd_init(&config_path, force),
        Command::Build { mode } => with_driver(root, &config_path, |driver| {
            let outcome = driver.build(mode.into())?;
            println!("Build result: exit status {}", outcome.code.unwrap_or_default());
            Ok(())
        }),
        Command::Clean => with_driver(root, &config_path, |driver| driver.clean().map(drop)),
        Command::Assemble => {
            with_driver(root, &config_path, |driver| driver.assemble().map(drop))
        }
        Command::Upload => with_driver(root, &config_path, |driver| driver.upload_archives()),
        Command::UploadLibrary { library } => with_driver(root, &config_path, |driver| {
            driver.upload_archives_single_library(&library).map(drop)
        }),
        Command::Restore => with_driver(root, &config_path, |driver| {
            let report = driver.restore()?;
            println!(
                "restore: restored={} without_backup={}",
                report.restored.len(),
                report.missing_backup.len()
            );
            Ok(())
        }),
        Command::Status => with_driver(root, &config_path, cmd_status),
        Command::ReleaseZip => cmd_release_zip(root, &load_config(&config_path)?),
    }
}

/// Load the project config and run `body` against a driver using the system runner.
fn with_driver(
    root: &Path,
    config_path: &Path,
    body: impl FnOnce(&BuildDriver<'_, SystemRunner>) -> Result<()>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let runner = SystemRunner {
        output_limit_bytes: config.output_limit_bytes,
        echo: true,
    };
    body(&BuildDriver::new(root, &config, &runner))
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if !force && path.exists() {
        println!("init: {} exists (use --force to overwrite)", path.display());
        return Ok(());
    }
    write_config(path, &ProjectConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    println!("init: wrote {}", path.display());
    Ok(())
}

fn cmd_status(driver: &BuildDriver<'_, SystemRunner>) -> Result<()> {
    for status in driver.status()? {
        let mode = match status.mode {
            Some(mode) => mode.to_string(),
            None => "missing".to_string(),
        };
        let backup = if status.has_backup { " (backup present)" } else { "" };
        let shown = status
            .path
            .strip_prefix(driver.root())
            .unwrap_or(&status.path);
        println!("{}: {mode}{backup}", shown.display());
    }
    Ok(())
}

fn cmd_release_zip(root: &Path, config: &ProjectConfig) -> Result<()> {
    let versions = ReleaseVersions::from_env(&config.release.layout)?;
    let runner = SystemRunner {
        output_limit_bytes: config.output_limit_bytes,
        echo: true,
    };
    let artifact = ReleaseAssembler::new(root, &config.release, &runner).assemble(&versions)?;
    println!("release: {}", artifact.zip.display());
    Ok(())
}
