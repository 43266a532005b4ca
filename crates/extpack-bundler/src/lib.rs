#![cfg_attr(docsrs, feature(doc_cfg))]

//! # extpack-bundler
//!
//! Building blocks for compiling a browser extension.
//!
//! The crate owns the [`BuildDescriptor`] (what to compile and how), the
//! [`Bundler`] capability that turns a descriptor into artifacts, the asset
//! [`stage`]r that copies static files into the output directory, and the
//! esbuild-backed implementation of the capability.
//!
//! ## Quick Start
//!
//! ```no_run
//! use extpack_bundler::{BuildDescriptor, Bundler, EsbuildBundler, NativeRuntime, stage};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let descriptor = BuildDescriptor::browser_extension(".");
//! stage(&NativeRuntime, "public".as_ref(), descriptor.out_dir()).await?;
//!
//! let bundler = EsbuildBundler::new(Default::default());
//! let report = bundler.compile_once(&descriptor).await?;
//! for artifact in &report.artifacts {
//!     println!("{} -> {}", artifact.entry, artifact.path.display());
//! }
//! # Ok(()) }
//! ```

pub mod bundler;
pub mod descriptor;
pub mod diagnostics;
pub mod esbuild;
pub mod runtime;
pub mod stage;
pub mod watch;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod testing;

pub use bundler::{Artifact, BuildReport, Bundler, Session, SessionEvent};
pub use descriptor::{
    BuildDescriptor, DEFAULT_ENTRY_POINTS, DescriptorBuilder, EntryPoint, EsTarget,
    NODE_ENV_DEFINE, OutputFormat, Platform, resolve_path,
};
pub use diagnostics::{Diagnostic, Severity};
pub use esbuild::{EsbuildBundler, EsbuildOptions};
pub use runtime::{DirEntry, EntryKind, NativeRuntime, Runtime, RuntimeError};
pub use stage::{StageError, StagedAssets, StagedFile, stage};
pub use watch::{WatchOptions, WatchSession};

#[cfg(any(test, feature = "test-utils"))]
pub use runtime::MemoryRuntime;

use std::path::PathBuf;

/// Errors produced while compiling entry points.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The descriptor violates an invariant the bundler relies on.
    #[error("Invalid build descriptor: {0}")]
    InvalidDescriptor(String),

    /// An entry point's source file does not exist.
    #[error("Entry point '{entry}' not found: {}", .path.display())]
    EntryNotFound { entry: String, path: PathBuf },

    /// The bundler executable could not be located.
    #[error("Could not find the {tool} executable")]
    ToolNotFound { tool: String, hint: String },

    /// The bundler process could not be started.
    #[error("Failed to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bundler reported errors.
    #[error("{}", format_diagnostics(.diagnostics))]
    Failed { diagnostics: Vec<Diagnostic> },

    /// The build report written by the bundler could not be read.
    #[error("Invalid metafile: {0}")]
    Metafile(String),

    /// The bundler exited successfully but an expected artifact is missing.
    #[error("Expected output for entry point '{entry}' was not written: {}", .path.display())]
    MissingOutput { entry: String, path: PathBuf },

    /// The file watcher could not be started.
    #[error("Failed to start watching: {0}")]
    Watch(String),
}

/// Result type alias for compile operations.
pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    /// Name of the entry point the error is about, if any.
    pub fn entry(&self) -> Option<&str> {
        match self {
            CompileError::EntryNotFound { entry, .. } | CompileError::MissingOutput { entry, .. } => {
                Some(entry)
            }
            _ => None,
        }
    }
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "Bundler exited with an error".to_string(),
        [single] => single.to_string(),
        many => format!(
            "{} errors: {}",
            many.len(),
            many.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}

impl miette::Diagnostic for CompileError {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            CompileError::InvalidDescriptor(_) => "INVALID_DESCRIPTOR",
            CompileError::EntryNotFound { .. } => "ENTRY_NOT_FOUND",
            CompileError::ToolNotFound { .. } => "TOOL_NOT_FOUND",
            CompileError::Spawn { .. } => "SPAWN_FAILED",
            CompileError::Failed { .. } => "COMPILE_ERROR",
            CompileError::Metafile(_) => "METAFILE_ERROR",
            CompileError::MissingOutput { .. } => "MISSING_OUTPUT",
            CompileError::Watch(_) => "WATCH_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            CompileError::EntryNotFound { path, .. } => Some(Box::new(format!(
                "Create {} or remove the entry from entryPoints.",
                path.display()
            ))),
            CompileError::ToolNotFound { hint, .. } => Some(Box::new(hint.clone())),
            CompileError::InvalidDescriptor(_) => Some(Box::new(
                "Check entryPoints and define in your configuration.".to_string(),
            )),
            CompileError::Failed { diagnostics } if diagnostics.len() > 1 => Some(Box::new(
                "Multiple bundler errors occurred. See details above.".to_string(),
            )),
            CompileError::Failed { diagnostics } => diagnostics
                .first()
                .and_then(|d| d.location())
                .map(|loc| Box::new(format!("at {}", loc)) as Box<dyn std::fmt::Display>),
            _ => None,
        }
    }
}
