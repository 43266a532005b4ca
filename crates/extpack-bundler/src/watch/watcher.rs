//! File system watcher with per-path debouncing.
//!
//! Watches the project directory recursively and forwards changes to
//! relevant files, ignoring dependencies, build output, hidden files and
//! configured patterns.

use crate::CompileError;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Drops repeated changes of one path within a time window.
///
/// Entries older than the window are pruned on every admitted change, so the
/// map only holds paths touched recently.
#[derive(Debug)]
struct Debouncer {
    window: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: HashMap::new(),
        }
    }

    /// Whether a change of `path` at `now` should be forwarded.
    fn admit(&mut self, path: &Path, now: Instant) -> bool {
        if let Some(last) = self.last_seen.get(path) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }

        let window = self.window;
        self.last_seen
            .retain(|_, seen| now.duration_since(*seen) < window);
        self.last_seen.insert(path.to_path_buf(), now);
        true
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.last_seen.len()
    }
}

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// File was modified
    Modified(PathBuf),
    /// File was created
    Created(PathBuf),
    /// File was removed
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Which paths under the watch root never trigger a rebuild.
///
/// Rules are matched against paths relative to the watch root.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    out_dir: Option<PathBuf>,
    patterns: Vec<String>,
}

impl IgnoreRules {
    /// `out_dir` is the output directory relative to the watch root, if it
    /// lies inside it.
    pub fn new(out_dir: Option<PathBuf>, patterns: Vec<String>) -> Self {
        Self { out_dir, patterns }
    }

    pub fn is_ignored(&self, rel_path: &Path) -> bool {
        if rel_path.as_os_str().is_empty() {
            return true;
        }

        if let Some(out_dir) = &self.out_dir {
            if rel_path.starts_with(out_dir) {
                return true;
            }
        }

        for component in rel_path.components() {
            match component {
                Component::Normal(name) => {
                    let Some(name) = name.to_str() else {
                        continue;
                    };
                    if name.starts_with('.') || name == "node_modules" {
                        return true;
                    }
                }
                // Only plain relative paths are watched
                _ => return true,
            }
        }

        let path_str = rel_path.to_string_lossy();
        for pattern in &self.patterns {
            if let Some(ext) = pattern.strip_prefix('*') {
                // Extension pattern like "*.log"
                if path_str.ends_with(ext) {
                    return true;
                }
            } else {
                // Directory pattern like "coverage" or "src/generated"
                let pattern = pattern.trim_end_matches('/');
                if rel_path.starts_with(pattern) || path_str.contains(&format!("/{}/", pattern)) {
                    return true;
                }
            }
        }

        false
    }
}

/// Recursive file watcher.
///
/// Changes are sent through a channel. A path that changes again within the
/// debounce window is dropped so one save produces one event.
pub struct FileWatcher {
    /// Underlying notify watcher
    _watcher: RecommendedWatcher,
    /// Canonical root directory being watched
    root: PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher").field("root", &self.root).finish()
    }
}

impl FileWatcher {
    /// Create a new file watcher.
    ///
    /// # Arguments
    ///
    /// * `root` - Root directory to watch recursively
    /// * `rules` - Paths to ignore, relative to `root`
    /// * `debounce` - Window in which repeated changes of one path are dropped
    ///
    /// # Errors
    ///
    /// Returns `CompileError::Watch` if the root doesn't exist or the
    /// platform watcher cannot be started.
    pub fn new(
        root: &Path,
        rules: IgnoreRules,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<FileChange>), CompileError> {
        if !root.is_dir() {
            return Err(CompileError::Watch(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        // Some platforms report canonical paths
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        let (tx, rx) = mpsc::channel(100);
        let mut debouncer = Debouncer::new(debounce);
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "file watcher error");
                    return;
                }
            };

            for path in &event.paths {
                let Ok(rel_path) = path.strip_prefix(&root_clone) else {
                    continue;
                };
                if rules.is_ignored(rel_path) {
                    continue;
                }

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                if !debouncer.admit(path, Instant::now()) {
                    continue;
                }

                // The receiver is gone once the session stops
                if tx.blocking_send(change).is_err() {
                    return;
                }
            }
        })
        .map_err(|e| CompileError::Watch(e.to_string()))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| CompileError::Watch(e.to_string()))?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Get the canonical root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(patterns: &[&str]) -> IgnoreRules {
        IgnoreRules::new(
            Some(PathBuf::from("dist")),
            patterns.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[test]
    fn test_ignores_node_modules() {
        let rules = rules(&[]);
        assert!(rules.is_ignored(Path::new("node_modules/pkg/index.js")));
        assert!(rules.is_ignored(Path::new("packages/ui/node_modules/x.js")));
        assert!(!rules.is_ignored(Path::new("src/index.ts")));
    }

    #[test]
    fn test_ignores_output_directory() {
        let rules = rules(&[]);
        assert!(rules.is_ignored(Path::new("dist/popup.js")));
        assert!(rules.is_ignored(Path::new("dist")));
        assert!(!rules.is_ignored(Path::new("distribution/notes.ts")));
    }

    #[test]
    fn test_ignores_hidden_files() {
        let rules = rules(&[]);
        assert!(rules.is_ignored(Path::new(".git/config")));
        assert!(rules.is_ignored(Path::new(".env")));
        assert!(rules.is_ignored(Path::new("src/.hidden/file.ts")));
        assert!(rules.is_ignored(Path::new("src/.popup.ts.swp")));
    }

    #[test]
    fn test_ignores_extension_pattern() {
        let rules = rules(&["*.log"]);
        assert!(rules.is_ignored(Path::new("debug.log")));
        assert!(!rules.is_ignored(Path::new("src/log.ts")));
    }

    #[test]
    fn test_ignores_directory_pattern() {
        let rules = rules(&["coverage", "src/generated/"]);
        assert!(rules.is_ignored(Path::new("coverage/lcov.info")));
        assert!(rules.is_ignored(Path::new("src/generated/api.ts")));
        assert!(!rules.is_ignored(Path::new("src/popup.ts")));
    }

    #[test]
    fn test_ignores_non_relative_paths() {
        let rules = IgnoreRules::default();
        assert!(rules.is_ignored(Path::new("../outside.ts")));
        assert!(rules.is_ignored(Path::new("")));
    }

    #[test]
    fn test_file_change_path() {
        let path = PathBuf::from("/project/src/index.ts");

        assert_eq!(FileChange::Modified(path.clone()).path(), path.as_path());
        assert_eq!(FileChange::Created(path.clone()).path(), path.as_path());
        assert_eq!(FileChange::Removed(path.clone()).path(), path.as_path());
    }

    #[test]
    fn test_debouncer_drops_repeats_within_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let start = Instant::now();
        let path = Path::new("/p/src/popup.ts");

        assert!(debouncer.admit(path, start));
        assert!(!debouncer.admit(path, start + Duration::from_millis(50)));
        assert!(debouncer.admit(path, start + Duration::from_millis(150)));
    }

    #[test]
    fn test_debouncer_prunes_stale_paths() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let start = Instant::now();

        for i in 0..50 {
            assert!(debouncer.admit(&PathBuf::from(format!("/p/src/file{i}.ts")), start));
        }
        assert_eq!(debouncer.tracked(), 50);

        assert!(debouncer.admit(Path::new("/p/src/popup.ts"), start + Duration::from_secs(1)));
        assert_eq!(debouncer.tracked(), 1);
    }

    #[tokio::test]
    async fn test_watcher_rejects_missing_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = FileWatcher::new(
            &temp.path().join("missing"),
            IgnoreRules::default(),
            Duration::from_millis(10),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Watch(_)));
    }
}
