//! Store configuration

use serde::{Deserialize, Serialize};

/// Default name of the persisted state file
pub const DEFAULT_STATE_FILE: &str = ".forge_state.json";

/// How a fetch walks an asset's dependencies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Depth-first, in declaration order
    #[default]
    Sequential,
    /// Independent dependencies are resolved concurrently
    Concurrent,
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Dependency walk strategy
    pub resolve_mode: ResolveMode,
    /// Write the state file after each resolved asset
    pub persist_state: bool,
    /// State file name inside the store directory
    pub state_file_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            resolve_mode: ResolveMode::default(),
            persist_state: true,
            state_file_name: DEFAULT_STATE_FILE.to_string(),
        }
    }
}

impl StoreConfig {
    /// Set resolve mode
    #[must_use]
    pub fn with_resolve_mode(mut self, mode: ResolveMode) -> Self {
        self.resolve_mode = mode;
        self
    }

    /// Enable or disable writing the state file
    #[must_use]
    pub fn with_persist_state(mut self, persist: bool) -> Self {
        self.persist_state = persist;
        self
    }

    /// Set state file name
    #[must_use]
    pub fn with_state_file_name(mut self, name: impl Into<String>) -> Self {
        self.state_file_name = name.into();
        self
    }
}
