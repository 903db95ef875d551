//! Logging setup for the kiln CLI.
//!
//! Library crates only emit `tracing` events; this is the one place a
//! subscriber is installed.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("serving");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const KILN_CRATES: [&str; 5] = ["kiln", "kiln_cli", "kiln_engine", "kiln_plugins", "kiln_vfs"];

/// Initialize the global subscriber.
///
/// The filter is chosen in this order:
/// 1. `--verbose`: debug for every kiln crate
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG`
/// 4. info for every kiln crate
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize the global subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(directives("debug"))
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives("info")))
    }
}

fn directives(level: &str) -> String {
    KILN_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}
