//! Build descriptor: the immutable value that governs one build invocation.
//!
//! A [`BuildDescriptor`] enumerates the entry points of the extension (one per
//! surface), where compiled output goes, and the output shape shared by every
//! entry point. It is assembled once through [`DescriptorBuilder`] and then
//! only read, usually behind an `Arc`.

use crate::CompileError;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Module format of the compiled artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ECMAScript modules
    #[default]
    Esm,
    /// CommonJS
    Cjs,
    /// Immediately invoked function expression
    Iife,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Esm => "esm",
            OutputFormat::Cjs => "cjs",
            OutputFormat::Iife => "iife",
        }
    }
}

/// Execution platform the artifacts run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Browser,
    Node,
    Neutral,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Browser => "browser",
            Platform::Node => "node",
            Platform::Neutral => "neutral",
        }
    }
}

/// ECMAScript language level of the emitted code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EsTarget {
    Es2015,
    Es2016,
    Es2017,
    Es2018,
    Es2019,
    #[default]
    Es2020,
    Es2021,
    Es2022,
    EsNext,
}

impl EsTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            EsTarget::Es2015 => "es2015",
            EsTarget::Es2016 => "es2016",
            EsTarget::Es2017 => "es2017",
            EsTarget::Es2018 => "es2018",
            EsTarget::Es2019 => "es2019",
            EsTarget::Es2020 => "es2020",
            EsTarget::Es2021 => "es2021",
            EsTarget::Es2022 => "es2022",
            EsTarget::EsNext => "esnext",
        }
    }
}

impl fmt::Display for EsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One independently compiled extension surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPoint {
    name: String,
    source: PathBuf,
}

impl EntryPoint {
    /// Create an entry point named after the source file stem.
    ///
    /// `src/popup.ts` becomes the entry `popup`, compiled to `popup.js`.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source: PathBuf = source.into();
        let name = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("index")
            .to_string();
        Self { name, source }
    }

    /// Create an entry point with an explicit artifact name.
    pub fn named(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source path as declared (usually relative to the project root).
    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// The immutable configuration value for one build invocation.
///
/// All entry points share the same format, platform, target, source-map
/// switch and define table. There are no setters: build a new descriptor to
/// change anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    cwd: PathBuf,
    entry_points: Vec<EntryPoint>,
    out_dir: PathBuf,
    format: OutputFormat,
    platform: Platform,
    target: EsTarget,
    sourcemap: bool,
    defines: BTreeMap<String, String>,
}

impl BuildDescriptor {
    /// Start building a descriptor rooted at `cwd`.
    pub fn builder(cwd: impl Into<PathBuf>) -> DescriptorBuilder {
        DescriptorBuilder::new(cwd)
    }

    /// The fixed descriptor of a browser extension project.
    ///
    /// Four surfaces (background, content, inpage, popup) under `src/`,
    /// compiled as browser ES modules targeting ES2020 into `dist/`, with
    /// external source maps and `process.env.NODE_ENV` baked to production.
    pub fn browser_extension(cwd: impl Into<PathBuf>) -> Self {
        Self::builder(cwd)
            .entries(DEFAULT_ENTRY_POINTS.iter().copied())
            .build()
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    /// Absolute output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn target(&self) -> EsTarget {
        self.target
    }

    pub fn sourcemap(&self) -> bool {
        self.sourcemap
    }

    pub fn defines(&self) -> &BTreeMap<String, String> {
        &self.defines
    }

    /// Absolute path of an entry point's source file.
    pub fn source_path(&self, entry: &EntryPoint) -> PathBuf {
        resolve_path(&self.cwd, entry.source())
    }

    /// Path of the compiled artifact for an entry point.
    pub fn artifact_path(&self, entry: &EntryPoint) -> PathBuf {
        self.out_dir.join(format!("{}.js", entry.name()))
    }

    /// Path of the source map for an entry point, if source maps are enabled.
    pub fn source_map_path(&self, entry: &EntryPoint) -> Option<PathBuf> {
        self.sourcemap
            .then(|| self.out_dir.join(format!("{}.js.map", entry.name())))
    }

    /// Check the invariants a bundler relies on.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::InvalidDescriptor` when there are no entry
    /// points, when two entries share an artifact name, or when a define has
    /// an empty key.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.entry_points.is_empty() {
            return Err(CompileError::InvalidDescriptor(
                "at least one entry point is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.entry_points {
            if entry.name().is_empty() {
                return Err(CompileError::InvalidDescriptor(format!(
                    "entry point '{}' has an empty name",
                    entry.source().display()
                )));
            }
            if !seen.insert(entry.name()) {
                return Err(CompileError::InvalidDescriptor(format!(
                    "duplicate entry point name '{}'",
                    entry.name()
                )));
            }
        }

        if self.defines.keys().any(|k| k.trim().is_empty()) {
            return Err(CompileError::InvalidDescriptor(
                "define keys cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Entry points of a browser extension, one per surface.
pub const DEFAULT_ENTRY_POINTS: &[&str] = &[
    "src/background.ts",
    "src/content.ts",
    "src/inpage.ts",
    "src/popup.ts",
];

/// Define applied to every bundle by default.
pub const NODE_ENV_DEFINE: (&str, &str) = ("process.env.NODE_ENV", "\"production\"");

/// Builder for [`BuildDescriptor`].
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    cwd: PathBuf,
    entry_points: Vec<EntryPoint>,
    out_dir: PathBuf,
    format: OutputFormat,
    platform: Platform,
    target: EsTarget,
    sourcemap: bool,
    defines: BTreeMap<String, String>,
}

impl DescriptorBuilder {
    fn new(cwd: impl Into<PathBuf>) -> Self {
        let cwd: PathBuf = cwd.into();
        let mut defines = BTreeMap::new();
        defines.insert(NODE_ENV_DEFINE.0.to_string(), NODE_ENV_DEFINE.1.to_string());

        Self {
            cwd: cwd.clean(),
            entry_points: Vec::new(),
            out_dir: PathBuf::from("dist"),
            format: OutputFormat::Esm,
            platform: Platform::Browser,
            target: EsTarget::Es2020,
            sourcemap: true,
            defines,
        }
    }

    /// Append one entry point.
    pub fn entry(mut self, entry: EntryPoint) -> Self {
        self.entry_points.push(entry);
        self
    }

    /// Append entry points named after their file stems.
    pub fn entries<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.entry_points
            .extend(sources.into_iter().map(EntryPoint::new));
        self
    }

    /// Output directory, relative paths resolve against the project root.
    pub fn out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn target(mut self, target: EsTarget) -> Self {
        self.target = target;
        self
    }

    pub fn sourcemap(mut self, enabled: bool) -> Self {
        self.sourcemap = enabled;
        self
    }

    /// Replace the whole define table.
    pub fn defines<I, K, V>(mut self, defines: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.defines = defines
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Add or override a single define.
    pub fn define(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> BuildDescriptor {
        let out_dir = resolve_path(&self.cwd, &self.out_dir);
        BuildDescriptor {
            cwd: self.cwd,
            entry_points: self.entry_points,
            out_dir,
            format: self.format,
            platform: self.platform,
            target: self.target,
            sourcemap: self.sourcemap,
            defines: self.defines,
        }
    }
}

/// Resolve `path` against `cwd` and clean it lexically.
///
/// Absolute paths are only cleaned.
pub fn resolve_path(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf().clean()
    } else {
        cwd.join(path).clean()
    }
}
