//! Command-line interface definition for extpack.
//!
//! There are no subcommands: one invocation stages the static assets,
//! compiles every entry point and then exits, or keeps watching when
//! `--watch` is given.


use crate::controller::RunMode;
use clap::Parser;
use std::path::PathBuf;

/// extpack - build a browser extension
#[derive(Parser, Debug)]
#[command(
    name = "extpack",
    version,
    about = "Build a browser extension",
    long_about = "Copies the static assets from public/ into dist/ and compiles the\n\
                  background, content, in-page and popup scripts into dist/, one\n\
                  bundle and source map per entry point."
)]
pub struct Cli {
    /// Keep running and rebuild when sources change
    ///
    /// Rebuild failures are printed but never stop the watcher.
    #[arg(short, long)]
    pub watch: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Config file (defaults to extpack.config.json in the project root)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory, overrides the config file
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Static assets directory, overrides the config file
    #[arg(long, value_name = "DIR")]
    pub public_dir: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Lifecycle selected by the flags, decided once per invocation.
    pub fn run_mode(&self) -> RunMode {
        if self.watch {
            RunMode::Watch
        } else {
            RunMode::OneShot
        }
    }
}
