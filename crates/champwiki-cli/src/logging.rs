//! Tracing subscriber setup.
//!
//! Logs always go to stderr so stdout carries only JSON.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::cli::Cli;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug, `--quiet`
/// errors only, and the default is warnings, which is where degraded
/// responses are reported.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())?;
        return Ok(());
    }

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };
    tracing::subscriber::set_global_default(builder.with_max_level(level).finish())?;
    Ok(())
}
