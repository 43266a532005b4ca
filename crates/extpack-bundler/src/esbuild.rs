//! esbuild-backed [`Bundler`].
//!
//! Every compile runs the `esbuild` executable once for all entry points.
//! esbuild writes the artifacts itself. It also writes a metafile that lists
//! every input it read, which becomes the reachable input set of the
//! [`BuildReport`].

use crate::bundler::{Artifact, BuildReport, Bundler};
use crate::diagnostics::{Diagnostic, parse_esbuild_log};
use crate::watch::{WatchOptions, WatchSession};
use crate::{BuildDescriptor, CompileError};
use async_trait::async_trait;
use path_clean::PathClean;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const TOOL: &str = "esbuild";

/// Configuration of the esbuild backend.
#[derive(Debug, Clone, Default)]
pub struct EsbuildOptions {
    /// Explicit path to the executable. Looked up when unset.
    pub binary: Option<PathBuf>,
    /// Settings for sessions created by this bundler
    pub watch: WatchOptions,
}

/// Bundler that drives the esbuild command line.
#[derive(Debug, Clone, Default)]
pub struct EsbuildBundler {
    options: Arc<EsbuildOptions>,
}

impl EsbuildBundler {
    pub fn new(options: EsbuildOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// Find the esbuild executable for a project.
    ///
    /// Tries the configured path, then the project's
    /// `node_modules/.bin/esbuild`, then `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::ToolNotFound` when none of them exists.
    pub fn locate(&self, cwd: &Path) -> Result<PathBuf, CompileError> {
        if let Some(binary) = &self.options.binary {
            let binary = if binary.is_absolute() {
                binary.clone()
            } else {
                cwd.join(binary).clean()
            };
            if binary.is_file() {
                return Ok(binary);
            }
            return Err(CompileError::ToolNotFound {
                tool: TOOL.to_string(),
                hint: format!(
                    "The configured esbuild path {} does not exist.",
                    binary.display()
                ),
            });
        }

        let local = cwd
            .join("node_modules")
            .join(".bin")
            .join(if cfg!(windows) { "esbuild.cmd" } else { TOOL });
        if local.is_file() {
            return Ok(local);
        }

        which::which(TOOL).map_err(|_| CompileError::ToolNotFound {
            tool: TOOL.to_string(),
            hint: "Install it with `npm install --save-dev esbuild` or set the esbuild path in extpack.config.json.".to_string(),
        })
    }
}

/// Command-line arguments for one esbuild run.
pub fn build_args(descriptor: &BuildDescriptor, metafile: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = descriptor
        .entry_points()
        .iter()
        .map(|entry| {
            let mut arg = OsString::from(format!("{}=", entry.name()));
            arg.push(entry.source());
            arg
        })
        .collect();

    args.push("--bundle".into());

    let mut out_dir = OsString::from("--outdir=");
    out_dir.push(descriptor.out_dir());
    args.push(out_dir);

    args.push(format!("--format={}", descriptor.format().as_str()).into());
    args.push(format!("--platform={}", descriptor.platform().as_str()).into());
    args.push(format!("--target={}", descriptor.target()).into());

    if descriptor.sourcemap() {
        args.push("--sourcemap".into());
    }

    for (key, value) in descriptor.defines() {
        args.push(format!("--define:{}={}", key, value).into());
    }

    let mut meta = OsString::from("--metafile=");
    meta.push(metafile);
    args.push(meta);

    args.push("--log-level=warning".into());
    args.push("--color=false".into());
    args
}

/// The part of esbuild's metafile we read.
#[derive(Debug, Deserialize)]
struct Metafile {
    inputs: BTreeMap<String, serde::de::IgnoredAny>,
}

/// Absolute paths of every file the build read.
///
/// Metafile paths are relative to the working directory esbuild ran in.
/// Virtual inputs such as `<stdin>` or namespaced paths are skipped.
fn parse_metafile(json: &str, cwd: &Path) -> Result<BTreeSet<PathBuf>, CompileError> {
    let meta: Metafile =
        serde_json::from_str(json).map_err(|e| CompileError::Metafile(e.to_string()))?;

    Ok(meta
        .inputs
        .keys()
        .filter(|key| Path::new(key).is_absolute() || !(key.starts_with('<') || key.contains(':')))
        .map(|key| cwd.join(key).clean())
        .collect())
}

async fn check_entries(descriptor: &BuildDescriptor) -> Result<(), CompileError> {
    for entry in descriptor.entry_points() {
        let path = descriptor.source_path(entry);
        let exists = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !exists {
            return Err(CompileError::EntryNotFound {
                entry: entry.name().to_string(),
                path,
            });
        }
    }
    Ok(())
}

async fn collect_artifacts(descriptor: &BuildDescriptor) -> Result<Vec<Artifact>, CompileError> {
    let mut artifacts = Vec::with_capacity(descriptor.entry_points().len());

    for entry in descriptor.entry_points() {
        let path = descriptor.artifact_path(entry);
        let bytes = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(_) => {
                return Err(CompileError::MissingOutput {
                    entry: entry.name().to_string(),
                    path,
                });
            }
        };

        let source_map = descriptor.source_map_path(entry);
        if let Some(map) = &source_map {
            if tokio::fs::metadata(map).await.is_err() {
                return Err(CompileError::MissingOutput {
                    entry: entry.name().to_string(),
                    path: map.clone(),
                });
            }
        }

        artifacts.push(Artifact {
            entry: entry.name().to_string(),
            path,
            bytes,
            source_map,
        });
    }

    Ok(artifacts)
}

/// Turn a failed run's stderr into a compile error.
fn failure(stderr: &str, status: std::process::ExitStatus) -> CompileError {
    let mut diagnostics: Vec<Diagnostic> = parse_esbuild_log(stderr)
        .into_iter()
        .filter(Diagnostic::is_error)
        .collect();

    if diagnostics.is_empty() {
        // Usage errors and crashes don't use the diagnostic format
        let message = stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(str::to_string)
            .unwrap_or_else(|| format!("esbuild exited with {}", status));
        diagnostics.push(Diagnostic::error(message));
    }

    CompileError::Failed { diagnostics }
}

#[async_trait]
impl Bundler for EsbuildBundler {
    type Session = WatchSession<EsbuildBundler>;

    async fn compile_once(&self, descriptor: &BuildDescriptor) -> Result<BuildReport, CompileError> {
        let started = Instant::now();

        descriptor.validate()?;
        check_entries(descriptor).await?;
        let binary = self.locate(descriptor.cwd())?;

        let metafile = tempfile::Builder::new()
            .prefix("extpack-meta-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| CompileError::Metafile(format!("cannot create metafile: {}", e)))?;

        let args = build_args(descriptor, metafile.path());
        debug!(binary = %binary.display(), ?args, "running esbuild");

        let output = tokio::process::Command::new(&binary)
            .args(&args)
            .current_dir(descriptor.cwd())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                program: binary.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(failure(&stderr, output.status));
        }

        let warnings = parse_esbuild_log(&stderr);
        for diagnostic in &warnings {
            warn!(location = %diagnostic.location().unwrap_or_default(), "{}", diagnostic.message);
        }

        let json = tokio::fs::read_to_string(metafile.path())
            .await
            .map_err(|e| CompileError::Metafile(e.to_string()))?;
        let inputs = parse_metafile(&json, descriptor.cwd())?;
        let artifacts = collect_artifacts(descriptor).await?;

        Ok(BuildReport {
            artifacts,
            inputs,
            warnings,
            duration: started.elapsed(),
        })
    }

    async fn create_session(
        &self,
        descriptor: Arc<BuildDescriptor>,
    ) -> Result<Self::Session, CompileError> {
        descriptor.validate()?;
        check_entries(&descriptor).await?;
        // Surface a missing executable now rather than on the first rebuild
        self.locate(descriptor.cwd())?;

        Ok(WatchSession::new(
            self.clone(),
            descriptor,
            self.options.watch.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EsTarget, OutputFormat, Platform};
    use tempfile::TempDir;

    fn as_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_build_args_for_extension() {
        let descriptor = BuildDescriptor::browser_extension("/p");
        let args = as_strings(&build_args(&descriptor, Path::new("/tmp/meta.json")));

        assert_eq!(
            &args[..4],
            &[
                "background=src/background.ts",
                "content=src/content.ts",
                "inpage=src/inpage.ts",
                "popup=src/popup.ts",
            ]
        );
        assert!(args.contains(&"--bundle".to_string()));
        assert!(args.contains(&"--outdir=/p/dist".to_string()));
        assert!(args.contains(&"--format=esm".to_string()));
        assert!(args.contains(&"--platform=browser".to_string()));
        assert!(args.contains(&"--target=es2020".to_string()));
        assert!(args.contains(&"--sourcemap".to_string()));
        assert!(args.contains(&"--define:process.env.NODE_ENV=\"production\"".to_string()));
        assert!(args.contains(&"--metafile=/tmp/meta.json".to_string()));
    }

    #[test]
    fn test_build_args_respect_descriptor() {
        let descriptor = BuildDescriptor::builder("/p")
            .entries(["src/worker.ts"])
            .format(OutputFormat::Iife)
            .platform(Platform::Neutral)
            .target(EsTarget::EsNext)
            .sourcemap(false)
            .defines([("__DEV__", "false")])
            .build();
        let args = as_strings(&build_args(&descriptor, Path::new("/tmp/m.json")));

        assert!(args.contains(&"--format=iife".to_string()));
        assert!(args.contains(&"--platform=neutral".to_string()));
        assert!(args.contains(&"--target=esnext".to_string()));
        assert!(!args.contains(&"--sourcemap".to_string()));
        assert!(args.contains(&"--define:__DEV__=false".to_string()));
        assert!(!args.iter().any(|a| a.contains("NODE_ENV")));
    }

    #[test]
    fn test_parse_metafile_inputs() {
        let json = r#"{
            "inputs": {
                "src/popup.ts": { "bytes": 120, "imports": [] },
                "src/lib/../shared.ts": { "bytes": 40, "imports": [] },
                "<stdin>": { "bytes": 1, "imports": [] },
                "node_modules/preact/dist/preact.module.js": { "bytes": 10, "imports": [] }
            },
            "outputs": {}
        }"#;
        let inputs = parse_metafile(json, Path::new("/p")).unwrap();

        let expected: BTreeSet<PathBuf> = [
            "/p/src/popup.ts",
            "/p/src/shared.ts",
            "/p/node_modules/preact/dist/preact.module.js",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(inputs, expected);
    }

    #[test]
    fn test_parse_metafile_rejects_garbage() {
        let err = parse_metafile("not json", Path::new("/p")).unwrap_err();
        assert!(matches!(err, CompileError::Metafile(_)));
    }

    #[tokio::test]
    async fn test_compile_reports_missing_entry_by_name() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        for name in ["background", "content", "inpage"] {
            std::fs::write(temp.path().join(format!("src/{name}.ts")), "export {}").unwrap();
        }

        let descriptor = BuildDescriptor::browser_extension(temp.path());
        let err = EsbuildBundler::default()
            .compile_once(&descriptor)
            .await
            .unwrap_err();

        assert_eq!(err.entry(), Some("popup"));
        assert!(err.to_string().contains("popup"));
        assert!(!temp.path().join("dist/popup.js").exists());
    }

    #[tokio::test]
    async fn test_compile_rejects_invalid_descriptor() {
        let descriptor = BuildDescriptor::builder("/p").build();
        let err = EsbuildBundler::default()
            .compile_once(&descriptor)
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidDescriptor(_)));
    }

    #[test]
    fn test_locate_prefers_configured_binary() {
        let temp = TempDir::new().unwrap();
        let binary = temp.path().join("tools/esbuild");
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, "").unwrap();

        let bundler = EsbuildBundler::new(EsbuildOptions {
            binary: Some(PathBuf::from("tools/esbuild")),
            ..Default::default()
        });
        assert_eq!(bundler.locate(temp.path()).unwrap(), binary);
    }

    #[test]
    fn test_locate_missing_configured_binary() {
        let temp = TempDir::new().unwrap();
        let bundler = EsbuildBundler::new(EsbuildOptions {
            binary: Some(temp.path().join("nope")),
            ..Default::default()
        });
        let err = bundler.locate(temp.path()).unwrap_err();
        assert!(matches!(err, CompileError::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_project_local_binary() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("node_modules/.bin/esbuild");
        std::fs::create_dir_all(local.parent().unwrap()).unwrap();
        std::fs::write(&local, "").unwrap();

        assert_eq!(EsbuildBundler::default().locate(temp.path()).unwrap(), local);
    }

    #[test]
    fn test_failure_falls_back_to_last_line() {
        let status = std::process::Command::new(if cfg!(windows) { "cmd" } else { "false" })
            .args(if cfg!(windows) { &["/C", "exit 1"][..] } else { &[][..] })
            .status()
            .unwrap();
        let err = failure("\nerror: Invalid build flag: \"--nope\"\n\n", status);

        match err {
            CompileError::Failed { diagnostics } => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].message, "error: Invalid build flag: \"--nope\"");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
