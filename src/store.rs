use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Small bits of UI state that survive restarts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// Backend name of the last selected stream source
    #[serde(default)]
    pub last_source: Option<String>,
    /// Player command last used in the web context
    #[serde(default)]
    pub last_player: Option<String>,
}

impl AppState {
    /// Load state from disk; any failure yields the default state
    pub fn load() -> Self {
        match Self::state_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => {
                    debug!("loaded app state");
                    state
                }
                Err(e) => {
                    error!("failed to parse state: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("failed to read state: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        if let Some(path) = Self::state_path() {
            self.save_to(&path);
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            error!("failed to create state directory: {}", e);
            return;
        }

        match serde_json::to_string_pretty(self) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(path, contents) {
                    error!("failed to write state: {}", e);
                }
            }
            Err(e) => {
                error!("failed to serialize state: {}", e);
            }
        }
    }

    pub fn state_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "debrid-streams").map(|dirs| dirs.data_dir().join("state.json"))
    }
}
