//! Asset staging.
//!
//! Copies the static assets of an extension (manifest, icons, HTML pages)
//! from the public directory into the output directory before anything is
//! compiled. Only files directly under the public directory are copied.

use crate::runtime::{Runtime, RuntimeError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors raised while staging assets.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The public directory is missing or cannot be listed.
    #[error("Cannot read static assets directory {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    /// The output directory cannot be created.
    #[error("Cannot create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    /// A file could not be copied.
    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: RuntimeError,
    },
}

impl miette::Diagnostic for StageError {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            StageError::SourceUnreadable { .. } => "STAGE_SOURCE_UNREADABLE",
            StageError::CreateDir { .. } => "STAGE_CREATE_DIR",
            StageError::Copy { .. } => "STAGE_COPY",
        }))
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            StageError::SourceUnreadable {
                source: RuntimeError::FileNotFound(_),
                ..
            } => Some(Box::new(
                "Create the directory with your manifest.json, or point publicDir at it."
                    .to_string(),
            )),
            StageError::CreateDir { .. } | StageError::Copy { .. } => Some(Box::new(
                "Check disk space and permissions of the output directory.".to_string(),
            )),
            _ => None,
        }
    }
}

/// A file copied into the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub bytes: u64,
}

/// Files copied by one [`stage`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedAssets {
    pub files: Vec<StagedFile>,
}

impl StagedAssets {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }
}

/// Stage static assets from `source_dir` into `dest_dir`.
///
/// Creates `dest_dir` (and its parents) if needed, then copies every regular
/// file directly under `source_dir` to `dest_dir/<same name>`, overwriting
/// existing files. Sub-directories are skipped. Running it twice leaves the
/// same result as running it once.
///
/// # Errors
///
/// Returns `StageError` if the destination cannot be created, the source
/// cannot be listed, or any file fails to copy. Files copied before the
/// failure stay in place.
pub async fn stage<R>(runtime: &R, source_dir: &Path, dest_dir: &Path) -> Result<StagedAssets, StageError>
where
    R: Runtime + ?Sized,
{
    runtime
        .create_dir_all(dest_dir)
        .await
        .map_err(|source| StageError::CreateDir {
            path: dest_dir.to_path_buf(),
            source,
        })?;

    let entries = runtime
        .read_dir(source_dir)
        .await
        .map_err(|source| StageError::SourceUnreadable {
            path: source_dir.to_path_buf(),
            source,
        })?;

    let mut staged = StagedAssets::default();

    for entry in entries {
        if !entry.is_file() {
            warn!(
                name = %entry.name,
                dir = %source_dir.display(),
                "skipping non-file entry in static assets directory"
            );
            continue;
        }

        let from = source_dir.join(&entry.name);
        let to = dest_dir.join(&entry.name);

        let bytes = runtime
            .copy_file(&from, &to)
            .await
            .map_err(|source| StageError::Copy {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;

        debug!(file = %entry.name, bytes, "staged asset");
        staged.files.push(StagedFile {
            name: entry.name,
            bytes,
        });
    }

    Ok(staged)
}
