use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map the `-v` count to a level, warnings only by default
#[must_use]
pub const fn level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Filter from `RUST_LOG` when set, the verbosity level otherwise
#[must_use]
pub fn filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level(verbosity).as_str().to_lowercase()))
}

/// Send diagnostics to stderr; stdout and the inventory files stay clean
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(verbosity: u8) -> Result<()> {
    let debug = verbosity >= 2;

    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(verbosity))
        .with_target(debug)
        .with_file(debug)
        .with_line_number(debug)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("tracing shouldn't already have been set up")
}
