//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use extpack_bundler::CompileError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Compile(e) => compile_error_to_miette(e),
        // StageError carries its own code and help
        CliError::Stage(e) => Report::new(e),
        CliError::Config(e) => miette::miette!(
            code = "CONFIG_ERROR",
            "Configuration error: {}",
            e
        ),
        _ => miette::miette!("{}", err),
    }
}

/// Convert a compile error to a miette Report.
///
/// Several bundler diagnostics are listed one per line instead of being
/// joined into a single sentence.
pub fn compile_error_to_miette(err: CompileError) -> Report {
    match err {
        CompileError::Failed { diagnostics } if diagnostics.len() > 1 => {
            let lines = diagnostics
                .iter()
                .map(|d| format!("  {}", d))
                .collect::<Vec<_>>()
                .join("\n");
            miette::miette!(
                code = "COMPILE_ERROR",
                "{} errors:\n{}",
                diagnostics.len(),
                lines
            )
        }
        _ => Report::new(err),
    }
}
