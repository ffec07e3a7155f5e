//! Gradle build automation with guaranteed restoration of mode-switched files.
//!
//! Builds and publishes a multi-module project by switching a fixed set of
//! build files between a testing and an artifacts dependency reference,
//! running the build tool, and putting the files back afterwards, whatever
//! the outcome.
//!
//! - **[`core`]**: Pure logic (mode substitution, release naming, error types).
//! - **[`io`]**: Side effects (sidecar backups, config, process execution).
//!
//! [`transaction`] holds the scoped backup/mutate/restore guard; [`driver`] and
//! [`release`] compose it with the build tool to implement CLI commands.

pub mod core;
pub mod driver;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod release;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod transaction;
