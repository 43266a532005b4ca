//! Configuration system for extpack with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and the config file.
//! Priority: CLI > Environment > File > Defaults

mod conversions;
mod defaults;
mod loading;
mod types;
mod validation;

use extpack_bundler::{EsTarget, OutputFormat, Platform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use defaults::*;
pub use loading::{CONFIG_FILE_NAME, ConfigOverrides};
pub use types::*;

/// extpack configuration - loaded from extpack.config.json, the environment
/// and CLI args.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExtpackConfig {
    /// Entry point sources, one per extension surface
    #[serde(default = "default_entry_points")]
    pub entry_points: Vec<String>,

    /// Output directory for staged assets and bundles
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Static assets directory copied into the output directory
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Module format of the bundles (esm, cjs, iife)
    #[serde(default)]
    pub format: OutputFormat,

    /// Platform the bundles run on
    #[serde(default)]
    pub platform: Platform,

    /// JavaScript language level
    #[serde(default)]
    pub target: EsTarget,

    /// Emit an external source map next to every bundle
    #[serde(default = "default_sourcemap")]
    pub sourcemap: bool,

    /// Compile-time substitutions (identifier -> JavaScript expression)
    #[serde(default = "default_define")]
    pub define: BTreeMap<String, String>,

    /// Path to the esbuild executable (looked up when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esbuild: Option<PathBuf>,

    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for ExtpackConfig {
    fn default() -> Self {
        Self {
            entry_points: default_entry_points(),
            out_dir: default_out_dir(),
            public_dir: default_public_dir(),
            format: OutputFormat::default(),
            platform: Platform::default(),
            target: EsTarget::default(),
            sourcemap: default_sourcemap(),
            define: default_define(),
            esbuild: None,
            watch: WatchConfig::default(),
        }
    }
}
