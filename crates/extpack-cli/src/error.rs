//! Error handling for the extpack CLI.
//!
//! `CliError` is the one error type a build invocation can end with. Every
//! variant is fatal and goes through the failure reporter. Failures inside a
//! running watch session are not errors at this level: they are reported as
//! session events and never reach `CliError`.

mod miette;

pub use self::miette::{cli_error_to_miette, compile_error_to_miette};

use extpack_bundler::{CompileError, StageError};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (file not found, invalid syntax, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Static assets could not be staged
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Compilation or session establishment failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
///
/// These errors occur during config file loading, parsing, and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file doesn't exist at the given location
    #[error("Config file not found: {}\n\nHint: Create extpack.config.json or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// Config sources could not be merged into a valid configuration
    #[error("{0}\n\nHint: Check extpack.config.json syntax, field names and EXTPACK_* variables")]
    Invalid(String),

    /// Mutually exclusive options were specified
    #[error("Conflicting options: {0}")]
    ConflictingOptions(String),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;
