//! Failure reporter: the single exit path for fatal errors.
//!
//! Configuration, staging, one-shot compile and session establishment errors
//! all end here. Rebuild failures inside a watch session never do.

use crate::error::{CliError, cli_error_to_miette};
use miette::MietteHandlerOpts;

/// Install the miette report handler. Call once in main.
pub fn install_hook(color: bool) {
    // Fails only if a hook is already installed
    let _ = miette::set_hook(Box::new(move |_| {
        Box::new(MietteHandlerOpts::new().color(color).build())
    }));
}

/// Render the failure notice shown on stderr.
pub fn render(err: CliError) -> String {
    format!("Build failed:\n{:?}", cli_error_to_miette(err))
}

/// Print the error and exit with status 1.
pub fn report(err: CliError) -> ! {
    tracing::debug!(error = %err, "fatal error");
    eprintln!("{}", render(err));
    std::process::exit(1)
}
