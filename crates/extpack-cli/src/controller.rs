//! Run-mode controller: stage the static assets, then build once or watch.
//!
//! The lifecycle is decided once per invocation from `--watch`. Only staging,
//! the one-shot compile and session establishment can fail. Once a session is
//! resident, rebuild failures are printed and the process keeps running.

use crate::error::Result;
use crate::ui;
use extpack_bundler::{
    BuildDescriptor, BuildReport, Bundler, Runtime, Session, SessionEvent, stage,
};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info};

/// Lifecycle of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Compile every entry point once, then exit
    OneShot,
    /// Compile, then recompile on source changes until the process is killed
    Watch,
}

/// What a successful run leaves behind.
pub enum Outcome<S> {
    /// One-shot build finished
    Completed(BuildReport),
    /// Watch session is active and must be kept alive
    Resident(Resident<S>),
}

impl<S> std::fmt::Debug for Outcome<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Completed(report) => f.debug_tuple("Completed").field(report).finish(),
            Outcome::Resident(_) => f.write_str("Resident"),
        }
    }
}

/// An active watch session with its event subscription.
///
/// The subscription is taken before watching starts so the initial build's
/// events are not missed.
pub struct Resident<S> {
    session: S,
    events: broadcast::Receiver<SessionEvent>,
    cwd: PathBuf,
}

impl<S> Resident<S> {
    pub fn session(&self) -> &S {
        &self.session
    }
}

/// Drives one invocation against a bundler and a filesystem runtime.
#[derive(Debug)]
pub struct Controller<B, R> {
    bundler: B,
    runtime: R,
    public_dir: PathBuf,
}

impl<B, R> Controller<B, R>
where
    B: Bundler,
    R: Runtime,
{
    pub fn new(bundler: B, runtime: R, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundler,
            runtime,
            public_dir: public_dir.into(),
        }
    }

    /// Stage, then compile once or establish a watch session.
    ///
    /// # Errors
    ///
    /// Staging failures stop the run before the bundler is touched. Compile
    /// and session establishment failures are returned as they are.
    pub async fn run(
        &self,
        mode: RunMode,
        descriptor: Arc<BuildDescriptor>,
    ) -> Result<Outcome<B::Session>> {
        let staged = stage(&self.runtime, &self.public_dir, descriptor.out_dir()).await?;
        info!(
            files = staged.len(),
            from = %self.public_dir.display(),
            to = %descriptor.out_dir().display(),
            "staged static assets"
        );

        match mode {
            RunMode::OneShot => {
                let report = self.bundler.compile_once(&descriptor).await?;
                for warning in &report.warnings {
                    ui::warning(&warning.to_string());
                }
                ui::success("Build complete!");
                ui::print_build_summary(&report, descriptor.out_dir());
                Ok(Outcome::Completed(report))
            }
            RunMode::Watch => {
                let mut session = self.bundler.create_session(Arc::clone(&descriptor)).await?;
                let events = session.subscribe();
                session.watch().await?;
                ui::info("Watching for changes...");
                Ok(Outcome::Resident(Resident {
                    session,
                    events,
                    cwd: descriptor.cwd().to_path_buf(),
                }))
            }
        }
    }
}

/// Keep the session alive and print its events. Never returns.
pub async fn stay_resident<S: Session>(resident: Resident<S>) -> Infallible {
    let Resident {
        session: _session,
        mut events,
        cwd,
    } = resident;

    loop {
        match events.recv().await {
            Ok(event) => notices(&event, &cwd).into_iter().for_each(print_notice),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "session events dropped");
            }
            Err(RecvError::Closed) => {
                debug!("session event stream closed");
                return std::future::pending().await;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Notice {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
}

fn notices(event: &SessionEvent, cwd: &Path) -> Vec<Notice> {
    match event {
        SessionEvent::BuildStarted { trigger: None } => {
            vec![Notice::Info("Building...".to_string())]
        }
        SessionEvent::BuildStarted {
            trigger: Some(path),
        } => {
            let shown = path.strip_prefix(cwd).unwrap_or(path);
            vec![Notice::Info(format!("{} changed, rebuilding...", shown.display()))]
        }
        SessionEvent::BuildSucceeded(report) => report
            .warnings
            .iter()
            .map(|w| Notice::Warning(w.to_string()))
            .chain(std::iter::once(Notice::Success(format!(
                "Built {} bundles ({}) in {}",
                report.artifacts.len(),
                ui::format_size(report.total_bytes()),
                ui::format_duration(report.duration)
            ))))
            .collect(),
        SessionEvent::BuildFailed(err) => vec![Notice::Error(format!("Rebuild failed: {}", err))],
    }
}

fn print_notice(notice: Notice) {
    match notice {
        Notice::Info(msg) => ui::info(&msg),
        Notice::Success(msg) => ui::success(&msg),
        Notice::Warning(msg) => ui::warning(&msg),
        Notice::Error(msg) => ui::error(&msg),
    }
}
