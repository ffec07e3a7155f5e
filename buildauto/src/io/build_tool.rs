//! Build tool adapter.
//!
//! The [`CommandRunner`] trait decouples the driver from real subprocesses.
//! Tests use scripted runners that return predetermined exit statuses.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::types::BuildFailure;
use crate::io::process::run_command;

/// One external command line, run in `workdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            workdir: workdir.into(),
        }
    }

    /// Space-joined command line, for messages only.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Exit status and captured output of the most recent external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// `Ok(self)` on exit status 0, otherwise a [`BuildFailure`] for `invocation`.
    pub fn check(self, invocation: &Invocation) -> Result<BuildOutcome> {
        if self.success() {
            return Ok(self);
        }
        Err(BuildFailure {
            command: invocation.display(),
            code: self.code,
        }
        .into())
    }
}

/// Abstraction over external command execution.
pub trait CommandRunner {
    /// Run to completion. A non-zero exit is a normal outcome here, not an error.
    fn run(&self, invocation: &Invocation) -> Result<BuildOutcome>;
}

/// Runs commands as real child processes and echoes them to stdout.
pub struct SystemRunner {
    pub output_limit_bytes: usize,
    /// Print the command line before, and its output after, each run.
    pub echo: bool,
}

impl CommandRunner for SystemRunner {
    #[instrument(skip_all, fields(program = %invocation.program))]
    fn run(&self, invocation: &Invocation) -> Result<BuildOutcome> {
        let line = invocation.display();
        if self.echo {
            println!("{line}");
        }
        info!(workdir = %invocation.workdir.display(), command = %line, "running");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).current_dir(&invocation.workdir);
        let output = run_command(cmd, self.output_limit_bytes)
            .with_context(|| format!("run `{line}` in {}", invocation.workdir.display()))?;

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        stdout.push_str(&output.stdout_truncated_notice(&invocation.program));
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        stderr.push_str(&output.stderr_truncated_notice(&invocation.program));

        if self.echo {
            print!("{stdout}");
            eprint!("{stderr}");
        }
        Ok(BuildOutcome {
            code: output.status.code(),
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let inv = Invocation::new("./gradlew", vec!["clean".to_string()], "/tmp");
        assert_eq!(inv.display(), "./gradlew clean");
    }

    #[test]
    fn check_turns_nonzero_into_build_failure() {
        let inv = Invocation::new("./gradlew", vec!["assemble".to_string()], "/tmp");
        let outcome = BuildOutcome {
            code: Some(42),
            stdout: String::new(),
            stderr: String::new(),
        };
        let err = outcome.check(&inv).unwrap_err();
        let failure = err.downcast_ref::<BuildFailure>().expect("build failure");
        assert_eq!(failure.code, Some(42));
        assert_eq!(failure.command, "./gradlew assemble");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = SystemRunner {
            output_limit_bytes: 1024,
            echo: false,
        };
        let inv = Invocation::new(
            "sh",
            vec!["-c".to_string(), "pwd; exit 7".to_string()],
            temp.path(),
        );
        let outcome = runner.run(&inv).expect("run");
        assert_eq!(outcome.code, Some(7));
        assert!(!outcome.success());
        assert!(!outcome.stdout.trim().is_empty());
    }
}
