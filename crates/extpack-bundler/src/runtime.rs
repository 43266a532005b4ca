//! Filesystem runtime used by asset staging.
//!
//! Staging never touches `std::fs` directly. It goes through the [`Runtime`]
//! trait so the orchestration can run against [`NativeRuntime`] in production
//! and against [`MemoryRuntime`] in tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryRuntime;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Platform filesystem operations needed by the stager.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Create a directory and all missing parents. Succeeds if it exists.
    async fn create_dir_all(&self, path: &Path) -> RuntimeResult<()>;

    /// List the direct children of a directory.
    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<DirEntry>>;

    /// Copy a file byte for byte, overwriting the destination.
    ///
    /// Returns the number of bytes copied.
    async fn copy_file(&self, from: &Path, to: &Path) -> RuntimeResult<u64>;
}

/// Runtime backed by the native filesystem.
///
/// Blocking `std::fs` calls run on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(op: &str, path: &Path, e: std::io::Error) -> RuntimeError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RuntimeError::FileNotFound(path.to_path_buf())
    } else {
        RuntimeError::Io(format!("Failed to {} {}: {}", op, path.display(), e))
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn create_dir_all(&self, path: &Path) -> RuntimeResult<()> {
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            if path.exists() && !path.is_dir() {
                return Err(RuntimeError::NotADirectory(path));
            }
            std::fs::create_dir_all(&path).map_err(|e| io_error("create directory", &path, e))
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<DirEntry>> {
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            if path.exists() && !path.is_dir() {
                return Err(RuntimeError::NotADirectory(path));
            }

            let entries =
                std::fs::read_dir(&path).map_err(|e| io_error("read directory", &path, e))?;

            let mut result = Vec::new();
            for entry in entries {
                let entry = entry
                    .map_err(|e| RuntimeError::Io(format!("Failed to read directory entry: {}", e)))?;

                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                    continue;
                };

                // Follow symlinks so a linked manifest is staged like a regular file
                let kind = match std::fs::metadata(entry.path()) {
                    Ok(meta) if meta.is_file() => EntryKind::File,
                    Ok(meta) if meta.is_dir() => EntryKind::Dir,
                    _ => EntryKind::Other,
                };

                result.push(DirEntry { name, kind });
            }

            Ok(result)
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> RuntimeResult<u64> {
        let from = from.to_path_buf();
        let to = to.to_path_buf();

        tokio::task::spawn_blocking(move || {
            std::fs::copy(&from, &to).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound && !from.exists() {
                    RuntimeError::FileNotFound(from.clone())
                } else {
                    RuntimeError::Io(format!(
                        "Failed to copy {} to {}: {}",
                        from.display(),
                        to.display(),
                        e
                    ))
                }
            })
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }
}

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::*;
    use parking_lot::RwLock;
    use path_clean::PathClean;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;

    /// In-memory runtime for tests.
    ///
    /// Holds files and directories in maps keyed by cleaned absolute paths.
    /// Individual paths can be marked as failing to simulate permission or
    /// disk-full errors.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryRuntime {
        inner: Arc<RwLock<Inner>>,
    }

    #[derive(Debug, Default)]
    struct Inner {
        files: BTreeMap<PathBuf, Vec<u8>>,
        dirs: BTreeSet<PathBuf>,
        failing: BTreeSet<PathBuf>,
        copies: usize,
    }

    impl MemoryRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a file, creating its parent directories.
        pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
            let path = path.as_ref().clean();
            let mut inner = self.inner.write();
            if let Some(parent) = path.parent() {
                inner.add_dir(parent);
            }
            inner.files.insert(path, content.into());
        }

        /// Add an empty directory and its parents.
        pub fn add_dir(&self, path: impl AsRef<Path>) {
            self.inner.write().add_dir(&path.as_ref().clean());
        }

        /// Make every operation touching `path` fail with an I/O error.
        pub fn fail_on(&self, path: impl AsRef<Path>) {
            self.inner.write().failing.insert(path.as_ref().clean());
        }

        pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
            self.inner.read().files.get(&path.as_ref().clean()).cloned()
        }

        pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
            self.inner.read().dirs.contains(&path.as_ref().clean())
        }

        /// Names of the files directly under `dir`.
        pub fn file_names(&self, dir: impl AsRef<Path>) -> Vec<String> {
            let dir = dir.as_ref().clean();
            self.inner
                .read()
                .files
                .keys()
                .filter(|p| p.parent() == Some(dir.as_path()))
                .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
                .collect()
        }

        /// Number of successful copies performed so far.
        pub fn copy_count(&self) -> usize {
            self.inner.read().copies
        }
    }

    impl Inner {
        fn add_dir(&mut self, path: &Path) {
            for ancestor in path.ancestors() {
                if ancestor.as_os_str().is_empty() {
                    break;
                }
                self.dirs.insert(ancestor.to_path_buf());
            }
        }

        fn check(&self, path: &Path) -> RuntimeResult<()> {
            if self.failing.contains(path) {
                return Err(RuntimeError::Io(format!(
                    "Permission denied: {}",
                    path.display()
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Runtime for MemoryRuntime {
        async fn create_dir_all(&self, path: &Path) -> RuntimeResult<()> {
            let path = path.clean();
            let mut inner = self.inner.write();
            inner.check(&path)?;
            if inner.files.contains_key(&path) {
                return Err(RuntimeError::NotADirectory(path));
            }
            inner.add_dir(&path);
            Ok(())
        }

        async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<DirEntry>> {
            let path = path.clean();
            let inner = self.inner.read();
            inner.check(&path)?;
            if inner.files.contains_key(&path) {
                return Err(RuntimeError::NotADirectory(path));
            }
            if !inner.dirs.contains(&path) {
                return Err(RuntimeError::FileNotFound(path));
            }

            let name_of = |p: &Path| p.file_name().and_then(|n| n.to_str()).map(str::to_string);

            let files = inner
                .files
                .keys()
                .filter(|p| p.parent() == Some(path.as_path()))
                .filter_map(|p| name_of(p))
                .map(|name| DirEntry {
                    name,
                    kind: EntryKind::File,
                });
            let dirs = inner
                .dirs
                .iter()
                .filter(|p| p.parent() == Some(path.as_path()))
                .filter_map(|p| name_of(p))
                .map(|name| DirEntry {
                    name,
                    kind: EntryKind::Dir,
                });

            Ok(files.chain(dirs).collect())
        }

        async fn copy_file(&self, from: &Path, to: &Path) -> RuntimeResult<u64> {
            let from = from.clean();
            let to = to.clean();
            let mut inner = self.inner.write();
            inner.check(&from)?;
            inner.check(&to)?;

            let content = inner
                .files
                .get(&from)
                .cloned()
                .ok_or_else(|| RuntimeError::FileNotFound(from.clone()))?;

            match to.parent() {
                Some(parent) if inner.dirs.contains(parent) => {}
                _ => {
                    return Err(RuntimeError::Io(format!(
                        "Failed to copy {} to {}: parent directory does not exist",
                        from.display(),
                        to.display()
                    )));
                }
            }

            let len = content.len() as u64;
            inner.files.insert(to, content);
            inner.copies += 1;
            Ok(len)
        }
    }
}
