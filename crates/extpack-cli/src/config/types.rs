use serde::{Deserialize, Serialize};

use crate::config::defaults::default_debounce_ms;

/// Watch mode settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchConfig {
    /// Window in which changes are coalesced into one rebuild
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Paths that never trigger a rebuild (`*.ext` or a directory prefix)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ignore: Vec::new(),
        }
    }
}
