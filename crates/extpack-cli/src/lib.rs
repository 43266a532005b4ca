//! extpack CLI - build a browser extension from a source tree.
//!
//! One invocation stages `public/` into `dist/`, compiles every extension
//! surface through esbuild, and then either exits or keeps watching.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line surface
//! - [`config`] - Configuration loading (defaults, file, environment, flags)
//! - [`controller`] - Run-mode controller (one-shot or watch)
//! - [`reporter`] - Failure reporter
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal notices and build summaries

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod logger;
pub mod reporter;
pub mod ui;

pub use error::{CliError, ConfigError, Result};

use crate::cli::Cli;
use crate::config::{ConfigOverrides, ExtpackConfig};
use crate::controller::{Controller, Outcome};
use extpack_bundler::{EsbuildBundler, NativeRuntime, WatchSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load the configuration for `cli` and run the selected lifecycle.
///
/// # Errors
///
/// Returns every fatal error of the invocation; the caller hands it to
/// [`reporter::report`].
pub async fn run(cli: &Cli) -> Result<Outcome<WatchSession<EsbuildBundler>>> {
    let cwd = resolve_cwd(cli.cwd.as_deref())?;

    let overrides = ConfigOverrides {
        out_dir: cli.out_dir.clone(),
        public_dir: cli.public_dir.clone(),
    };
    let config = ExtpackConfig::load(&cwd, cli.config.as_deref(), &overrides)?;
    config.validate(&cwd)?;
    tracing::debug!(?config, "configuration loaded");

    let descriptor = Arc::new(config.descriptor(&cwd));
    let controller = Controller::new(
        EsbuildBundler::new(config.esbuild_options()),
        NativeRuntime::new(),
        config.resolved_public_dir(&cwd),
    );

    controller.run(cli.run_mode(), descriptor).await
}

/// Absolute project root, from `--cwd` or the current directory.
fn resolve_cwd(cwd: Option<&Path>) -> Result<PathBuf> {
    let cwd = match cwd {
        Some(dir) => std::path::absolute(dir)?,
        None => std::env::current_dir()?,
    };

    if !cwd.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Project root is not a directory: {}",
            cwd.display()
        )));
    }

    Ok(cwd)
}
