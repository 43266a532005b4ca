use crate::config::ExtpackConfig;
use crate::error::{ConfigError, Result};
use extpack_bundler::{EntryPoint, OutputFormat, Platform};
use std::collections::HashSet;
use std::path::Path;

impl ExtpackConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self, cwd: &Path) -> Result<()> {
        if self.entry_points.is_empty() {
            return Err(ConfigError::MissingField {
                field: "entryPoints".to_string(),
                hint: "Provide at least one entry point, e.g. [\"src/background.ts\"]".to_string(),
            }
            .into());
        }

        let mut names = HashSet::new();
        for source in &self.entry_points {
            let entry = EntryPoint::new(source);
            if !names.insert(entry.name().to_string()) {
                return Err(ConfigError::InvalidValue {
                    field: "entryPoints".to_string(),
                    value: source.clone(),
                    hint: format!(
                        "Another entry point also compiles to {}.js; rename one of the files",
                        entry.name()
                    ),
                }
                .into());
            }
        }

        if let Some(key) = self.define.keys().find(|k| k.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "define".to_string(),
                value: format!("{:?}", key),
                hint: "Define keys must be identifiers such as process.env.NODE_ENV".to_string(),
            }
            .into());
        }

        if self.format == OutputFormat::Iife && self.platform == Platform::Node {
            return Err(ConfigError::InvalidValue {
                field: "format".to_string(),
                value: "iife".to_string(),
                hint: "iife output needs the browser or neutral platform".to_string(),
            }
            .into());
        }

        if self.resolved_public_dir(cwd) == self.resolved_out_dir(cwd) {
            return Err(ConfigError::ConflictingOptions(format!(
                "publicDir and outDir both point to {}",
                self.resolved_out_dir(cwd).display()
            ))
            .into());
        }

        Ok(())
    }
}
