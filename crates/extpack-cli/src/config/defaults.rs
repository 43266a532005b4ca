use extpack_bundler::{DEFAULT_ENTRY_POINTS, NODE_ENV_DEFINE};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub fn default_entry_points() -> Vec<String> {
    DEFAULT_ENTRY_POINTS.iter().map(|s| s.to_string()).collect()
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

pub fn default_sourcemap() -> bool {
    true
}

pub fn default_define() -> BTreeMap<String, String> {
    BTreeMap::from([(NODE_ENV_DEFINE.0.to_string(), NODE_ENV_DEFINE.1.to_string())])
}

pub fn default_debounce_ms() -> u64 {
    100
}
