//! Watch sessions: rebuild the extension whenever one of its sources changes.
//!
//! A [`WatchSession`] wraps any [`Bundler`] and recompiles through its
//! one-shot path. The first build starts as soon as watching is active.
//! After that, only changes to files the last successful build actually
//! read trigger a rebuild, plus the project files in [`PROJECT_FILES`]. After
//! a failed build every change triggers one.
//!
//! Rebuild failures are logged and broadcast, never returned. The session
//! stays alive until the process exits.

mod watcher;

pub use watcher::{FileChange, FileWatcher, IgnoreRules};

use crate::bundler::{Bundler, Session, SessionEvent};
use crate::{BuildDescriptor, CompileError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Top-level files that change how sources compile without being read as
/// modules.
pub const PROJECT_FILES: &[&str] = &["package.json", "tsconfig.json", "jsconfig.json"];

/// Default debounce window for file changes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Tuning for watch sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Changes arriving within this window are coalesced into one rebuild
    pub debounce: Duration,
    /// Extra ignore patterns (`*.ext` or a directory prefix)
    pub ignore: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            ignore: Vec::new(),
        }
    }
}

/// A session that recompiles on change.
pub struct WatchSession<B> {
    bundler: B,
    descriptor: Arc<BuildDescriptor>,
    options: WatchOptions,
    events: broadcast::Sender<SessionEvent>,
    active: Option<Active>,
}

struct Active {
    _watcher: FileWatcher,
    _task: JoinHandle<()>,
}

impl<B> WatchSession<B>
where
    B: Bundler + Clone,
{
    pub fn new(bundler: B, descriptor: Arc<BuildDescriptor>, options: WatchOptions) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            bundler,
            descriptor,
            options,
            events,
            active: None,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.active.is_some()
    }

    fn ignore_rules(&self) -> IgnoreRules {
        let out_dir = self
            .descriptor
            .out_dir()
            .strip_prefix(self.descriptor.cwd())
            .ok()
            .map(Path::to_path_buf);
        IgnoreRules::new(out_dir, self.options.ignore.clone())
    }
}

#[async_trait]
impl<B> Session for WatchSession<B>
where
    B: Bundler + Clone,
{
    async fn watch(&mut self) -> Result<(), CompileError> {
        if self.active.is_some() {
            debug!("watch session already active");
            return Ok(());
        }

        let (watcher, changes) =
            FileWatcher::new(self.descriptor.cwd(), self.ignore_rules(), self.options.debounce)?;

        debug!(root = %watcher.root().display(), "file watcher started");

        let task = tokio::spawn(rebuild_loop(
            self.bundler.clone(),
            Arc::clone(&self.descriptor),
            watcher.root().to_path_buf(),
            changes,
            self.events.clone(),
            self.options.debounce,
        ));

        self.active = Some(Active {
            _watcher: watcher,
            _task: task,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Build once, then rebuild on every relevant change until the watcher stops.
async fn rebuild_loop<B: Bundler>(
    bundler: B,
    descriptor: Arc<BuildDescriptor>,
    root: PathBuf,
    mut changes: mpsc::Receiver<FileChange>,
    events: broadcast::Sender<SessionEvent>,
    debounce: Duration,
) {
    // Paths relative to the project root read by the last successful build
    let mut reachable: Option<HashSet<PathBuf>> = None;
    let mut trigger: Option<PathBuf> = None;

    loop {
        // Sending fails only when nobody is subscribed
        let _ = events.send(SessionEvent::BuildStarted {
            trigger: trigger.take(),
        });

        match bundler.compile_once(&descriptor).await {
            Ok(report) => {
                debug!(
                    artifacts = report.artifacts.len(),
                    duration_ms = report.duration.as_millis() as u64,
                    "build succeeded"
                );
                reachable = Some(
                    report
                        .inputs
                        .iter()
                        .filter_map(|p| p.strip_prefix(descriptor.cwd()).ok())
                        .map(Path::to_path_buf)
                        .collect(),
                );
                let _ = events.send(SessionEvent::BuildSucceeded(report));
            }
            Err(e) => {
                warn!(error = %e, "build failed, waiting for changes");
                // The failed edit may need a file the last good build never read
                reachable = None;
                let _ = events.send(SessionEvent::BuildFailed(Arc::new(e)));
            }
        }

        match next_relevant_change(&mut changes, &root, reachable.as_ref(), debounce).await {
            Some(path) => {
                debug!(path = %path.display(), "rebuilding after change");
                trigger = Some(path);
            }
            None => break,
        }
    }

    debug!("file watcher stopped, ending watch session");
}

/// Wait for a change that affects the build, then swallow the burst that follows it.
///
/// Returns `None` once the watcher is gone.
async fn next_relevant_change(
    changes: &mut mpsc::Receiver<FileChange>,
    root: &Path,
    reachable: Option<&HashSet<PathBuf>>,
    debounce: Duration,
) -> Option<PathBuf> {
    let path = loop {
        let change = changes.recv().await?;
        if is_relevant(change.path(), root, reachable) {
            break change.path().to_path_buf();
        }
    };

    while let Ok(Some(_)) = tokio::time::timeout(debounce, changes.recv()).await {}

    Some(path)
}

fn is_relevant(path: &Path, root: &Path, reachable: Option<&HashSet<PathBuf>>) -> bool {
    // No good build to compare against, so any change may fix the build
    let Some(inputs) = reachable else {
        return true;
    };
    let Ok(rel) = path.strip_prefix(root) else {
        return false;
    };
    inputs.contains(rel) || PROJECT_FILES.iter().any(|file| rel == Path::new(file))
}
