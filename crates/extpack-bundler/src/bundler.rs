//! The Bundler capability.
//!
//! Anything that can compile a [`BuildDescriptor`] into artifacts implements
//! [`Bundler`]. The orchestration only depends on this trait, so the esbuild
//! backend can be swapped for a fake in tests.

use crate::diagnostics::Diagnostic;
use crate::{BuildDescriptor, CompileError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// One compiled entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Entry point name
    pub entry: String,
    /// Absolute path of the emitted `.js` file
    pub path: PathBuf,
    /// Size of the emitted `.js` file
    pub bytes: u64,
    /// Absolute path of the source map, when source maps are enabled
    pub source_map: Option<PathBuf>,
}

/// Result of a successful compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// One artifact per entry point, in descriptor order
    pub artifacts: Vec<Artifact>,
    /// Absolute paths of every source file the build read
    pub inputs: BTreeSet<PathBuf>,
    /// Warnings the bundler printed while the build still succeeded
    pub warnings: Vec<Diagnostic>,
    pub duration: Duration,
}

impl BuildReport {
    pub fn total_bytes(&self) -> u64 {
        self.artifacts.iter().map(|a| a.bytes).sum()
    }

    pub fn artifact(&self, entry: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.entry == entry)
    }
}

/// Progress of a watch session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A build began. `trigger` is the changed file, `None` for the initial build.
    BuildStarted { trigger: Option<PathBuf> },
    BuildSucceeded(BuildReport),
    BuildFailed(Arc<CompileError>),
}

/// A long-lived compilation context that recompiles on source changes.
#[async_trait]
pub trait Session: Send + 'static {
    /// Start watching.
    ///
    /// Returns once the watcher is active. Rebuilds run in the background
    /// afterwards and their failures are reported as [`SessionEvent`]s, never
    /// through this method.
    async fn watch(&mut self) -> Result<(), CompileError>;

    /// Receive session events from now on.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

/// Compiles the entry points of a [`BuildDescriptor`].
#[async_trait]
pub trait Bundler: Send + Sync + 'static {
    type Session: Session;

    /// Compile every entry point once.
    ///
    /// # Errors
    ///
    /// Any entry failing to compile fails the whole build. Outputs already
    /// written for other entries are left in place.
    async fn compile_once(&self, descriptor: &BuildDescriptor) -> Result<BuildReport, CompileError>;

    /// Create a watch session for the descriptor.
    ///
    /// The session is inert until [`Session::watch`] is called.
    async fn create_session(
        &self,
        descriptor: Arc<BuildDescriptor>,
    ) -> Result<Self::Session, CompileError>;
}
