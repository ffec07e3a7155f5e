//! Tracing setup for the `buildauto` binary.
//!
//! Events cover sidecar backups and restores, per-file mode rewrites,
//! marker checks and each build tool command line. A restore that fails
//! inside a transaction's `Drop` is only visible here, at `error` level.
//!
//! The build tool's captured output is not traced; `io::build_tool::SystemRunner`
//! echoes it to stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `buildauto=info,warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=buildauto=debug buildauto build --mode testing
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("buildauto=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
