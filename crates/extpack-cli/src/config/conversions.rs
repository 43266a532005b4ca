use crate::config::ExtpackConfig;
use extpack_bundler::{BuildDescriptor, EsbuildOptions, WatchOptions, resolve_path};
use std::path::{Path, PathBuf};
use std::time::Duration;

impl ExtpackConfig {
    /// Build descriptor for a project rooted at `cwd`.
    pub fn descriptor(&self, cwd: &Path) -> BuildDescriptor {
        BuildDescriptor::builder(cwd)
            .entries(self.entry_points.iter())
            .out_dir(&self.out_dir)
            .format(self.format)
            .platform(self.platform)
            .target(self.target)
            .sourcemap(self.sourcemap)
            .defines(self.define.clone())
            .build()
    }

    pub fn esbuild_options(&self) -> EsbuildOptions {
        EsbuildOptions {
            binary: self.esbuild.clone(),
            watch: WatchOptions {
                debounce: Duration::from_millis(self.watch.debounce_ms),
                ignore: self.watch.ignore.clone(),
            },
        }
    }

    /// Absolute static assets directory.
    pub fn resolved_public_dir(&self, cwd: &Path) -> PathBuf {
        resolve_path(cwd, &self.public_dir)
    }

    /// Absolute output directory.
    pub fn resolved_out_dir(&self, cwd: &Path) -> PathBuf {
        resolve_path(cwd, &self.out_dir)
    }
}
