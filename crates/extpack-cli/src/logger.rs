//! Logging infrastructure for the extpack CLI.
//!
//! Structured logging on the `tracing` ecosystem. The library crate only
//! emits events; this module installs the subscriber once in `main`.
//!
//! # Example
//!
//! ```rust,no_run
//! use extpack_cli::logger::init_logger;
//! use tracing::{debug, info};
//!
//! init_logger(false, false, false);
//!
//! info!("Starting build");
//! debug!(entry = "popup", "compiling");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "extpack=debug,extpack_bundler=debug,extpack_cli=debug";
const QUIET_FILTER: &str = "extpack=error,extpack_bundler=error,extpack_cli=error";
const DEFAULT_FILTER: &str = "extpack=info,extpack_bundler=info,extpack_cli=info";

/// Pick the filter directives for the given flags.
///
/// 1. `--verbose`: DEBUG for extpack crates
/// 2. `--quiet`: ERROR only
/// 3. `RUST_LOG` environment variable
/// 4. INFO for extpack crates
fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the tracing subscriber.
///
/// Call once at the start of the program. Log lines go to stderr next to
/// the UI notices.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    // A second initialization (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_verbose_and_quiet_filters() {
        let verbose = filter_for(true, false).to_string();
        assert!(verbose.contains("extpack_bundler=debug"));
        assert!(verbose.contains("extpack_cli=debug"));

        let quiet = filter_for(false, true).to_string();
        assert!(quiet.contains("extpack_cli=error"));
        assert!(!quiet.contains("debug"));
    }

    #[test]
    #[serial]
    fn test_rust_log_used_by_default() {
        unsafe { std::env::set_var("RUST_LOG", "extpack_bundler=trace") };
        assert_eq!(filter_for(false, false).to_string(), "extpack_bundler=trace");

        unsafe { std::env::remove_var("RUST_LOG") };
        assert!(filter_for(false, false).to_string().contains("extpack_cli=info"));
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logger(false, true, true);
        init_logger(true, false, true);
    }
}
