//! extpack - build a browser extension.
//!
//! Parses arguments, sets up logging and colors, and hands the invocation to
//! the run-mode controller. Fatal errors go through the failure reporter.

use clap::Parser;
use extpack_cli::controller::{self, Outcome};
use extpack_cli::{cli, logger, reporter, ui};

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);
    reporter::install_hook(ui::colors_enabled());

    match extpack_cli::run(&args).await {
        Ok(Outcome::Completed(_)) => {}
        Ok(Outcome::Resident(resident)) => {
            controller::stay_resident(resident).await;
        }
        Err(err) => reporter::report(err),
    }
}
