//! Test doubles for the Bundler capability.
//!
//! [`FakeBundler`] behaves like a real bundler at the filesystem boundary:
//! it rejects missing entry sources and writes one artifact (plus source map)
//! per entry into the output directory. The JavaScript it writes is a stub.

use crate::bundler::{Artifact, BuildReport, Bundler, Session, SessionEvent};
use crate::diagnostics::Diagnostic;
use crate::{BuildDescriptor, CompileError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::broadcast;

#[derive(Debug, Default)]
struct FakeState {
    compile_failure: Mutex<Option<String>>,
    session_failure: Mutex<Option<String>>,
    compiles: AtomicUsize,
    sessions: AtomicUsize,
}

/// In-process bundler for tests.
#[derive(Debug, Clone, Default)]
pub struct FakeBundler {
    state: Arc<FakeState>,
}

impl FakeBundler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every compile fail with the given message.
    pub fn fail_with(self, message: impl Into<String>) -> Self {
        self.set_compile_failure(Some(message.into()));
        self
    }

    /// Make session creation fail with the given message.
    pub fn fail_session_with(self, message: impl Into<String>) -> Self {
        *self.state.session_failure.lock() = Some(message.into());
        self
    }

    /// Change compile behaviour of this bundler and all its clones.
    pub fn set_compile_failure(&self, message: Option<String>) {
        *self.state.compile_failure.lock() = message;
    }

    pub fn compile_count(&self) -> usize {
        self.state.compiles.load(Ordering::SeqCst)
    }

    pub fn session_count(&self) -> usize {
        self.state.sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bundler for FakeBundler {
    type Session = FakeSession;

    async fn compile_once(&self, descriptor: &BuildDescriptor) -> Result<BuildReport, CompileError> {
        let started = Instant::now();
        self.state.compiles.fetch_add(1, Ordering::SeqCst);
        descriptor.validate()?;

        let failure = self.state.compile_failure.lock().clone();
        if let Some(message) = failure {
            return Err(CompileError::Failed {
                diagnostics: vec![Diagnostic::error(message)],
            });
        }

        for entry in descriptor.entry_points() {
            let path = descriptor.source_path(entry);
            if !path.is_file() {
                return Err(CompileError::EntryNotFound {
                    entry: entry.name().to_string(),
                    path,
                });
            }
        }

        tokio::fs::create_dir_all(descriptor.out_dir())
            .await
            .map_err(|e| CompileError::Failed {
                diagnostics: vec![Diagnostic::error(e.to_string())],
            })?;

        let mut report = BuildReport::default();
        for entry in descriptor.entry_points() {
            let path = descriptor.artifact_path(entry);
            let code = format!("// {}\nexport {{}};\n", entry.name());
            write(&path, code.as_bytes()).await?;

            let source_map = descriptor.source_map_path(entry);
            if let Some(map) = &source_map {
                write(map, br#"{"version":3,"sources":[],"mappings":""}"#).await?;
            }

            report.inputs.insert(descriptor.source_path(entry));
            report.artifacts.push(Artifact {
                entry: entry.name().to_string(),
                path,
                bytes: code.len() as u64,
                source_map,
            });
        }

        report.duration = started.elapsed();
        Ok(report)
    }

    async fn create_session(
        &self,
        descriptor: Arc<BuildDescriptor>,
    ) -> Result<Self::Session, CompileError> {
        descriptor.validate()?;
        let failure = self.state.session_failure.lock().clone();
        if let Some(message) = failure {
            return Err(CompileError::Watch(message));
        }
        self.state.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession::new())
    }
}

async fn write(path: &std::path::Path, content: &[u8]) -> Result<(), CompileError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| CompileError::Failed {
            diagnostics: vec![Diagnostic::error(format!("{}: {}", path.display(), e))],
        })
}

/// Session returned by [`FakeBundler`]. Never touches the filesystem.
#[derive(Debug, Clone)]
pub struct FakeSession {
    events: broadcast::Sender<SessionEvent>,
    watching: Arc<AtomicBool>,
}

impl FakeSession {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            watching: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    /// Publish an event as if a rebuild happened.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn watch(&mut self) -> Result<(), CompileError> {
        self.watching.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
