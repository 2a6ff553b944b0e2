use crate::{BoardError, BoardResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the board does with its optimistic state when the server rejects a move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Leave the speculative state in place until the next refresh.
    #[default]
    Keep,
    /// Restore the affected tasks to their pre-drop snapshot.
    Rollback,
    /// Re-fetch tasks from the server and replace the affected entries.
    Refetch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_discard_stale_responses")]
    pub discard_stale_responses: bool,
}

fn default_discard_stale_responses() -> bool {
    true
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            discard_stale_responses: default_discard_stale_responses(),
        }
    }
}

impl BoardConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/taskboard/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("taskboard/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("taskboard\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load the user's config file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                match Self::from_path(&config_path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(
                            "Ignoring invalid config at {}: {}",
                            config_path.display(),
                            e
                        );
                    }
                }
            }
        }
        Self::default()
    }

    /// Load an explicitly requested config file. Unlike [`BoardConfig::load`]
    /// this reports errors instead of falling back.
    pub fn from_path(path: &Path) -> BoardResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| BoardError::Config(e.to_string()))
    }
}
