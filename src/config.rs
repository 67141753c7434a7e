use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::addon::AddonClient;
use crate::player::PlayerContext;
use crate::source::Backend;
use crate::trakt::TraktClient;

pub const DEFAULT_METADATA_URL: &str = "https://v3-cinemeta.strem.io";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error("config file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub trakt: TraktConfig,
}

/// Manifest (install) URLs of the stream addons
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub aiostreams: Option<String>,
    pub comet: Option<String>,
    pub torrentio: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            aiostreams: None,
            comet: None,
            torrentio: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

impl SourcesConfig {
    pub fn url(&self, backend: Backend) -> Option<&str> {
        let url = match backend {
            Backend::AioStreams => self.aiostreams.as_deref(),
            Backend::Comet => self.comet.as_deref(),
            Backend::Torrentio => self.torrentio.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }

    /// Backends with a URL set, in display order
    pub fn configured(&self) -> Vec<Backend> {
        Backend::ALL
            .into_iter()
            .filter(|b| self.url(*b).is_some())
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Client for a backend; unconfigured backends get an empty base URL
    pub fn client(&self, backend: Backend) -> AddonClient {
        AddonClient::new(self.url(backend).unwrap_or_default(), self.timeout())
    }
}

/// Addon used to look up season and episode counts
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metadata_url")]
    pub url: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_metadata_url(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Hand URLs to the last used player without synthesized headers
    #[serde(default)]
    pub web: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
            args: Vec::new(),
            web: false,
        }
    }
}

fn default_player_command() -> String {
    "mpv".to_string()
}

impl PlayerConfig {
    pub fn context(&self) -> PlayerContext {
        if self.web {
            PlayerContext::Web
        } else {
            PlayerContext::Native
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraktConfig {
    #[serde(default)]
    pub enabled: bool,
    pub client_id: Option<String>,
    pub access_token: Option<String>,
}

impl TraktConfig {
    /// Client when enabled and credentials are present
    pub fn client(&self) -> Option<TraktClient> {
        if !self.enabled {
            return None;
        }
        TraktClient::new(self.client_id.clone(), self.access_token.clone()).ok()
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.clone()));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("", "", "debrid-streams")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn metadata_client(&self) -> Option<AddonClient> {
        if !self.metadata.enabled || self.metadata.url.trim().is_empty() {
            return None;
        }
        Some(AddonClient::new(&self.metadata.url, self.sources.timeout()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // No source is fine; the stream screen reports it per backend
        for backend in Backend::ALL {
            if let Some(url) = self.sources.url(backend)
                && !url.starts_with("http://")
                && !url.starts_with("https://")
            {
                return Err(ConfigError::ValidationError(format!(
                    "sources.{} must start with http:// or https://",
                    backend.name()
                )));
            }
        }

        if self.metadata.enabled {
            let url = self.metadata.url.trim();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(
                    "metadata.url must start with http:// or https://".to_string(),
                ));
            }
        }

        if self.player.command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "player.command cannot be empty".to_string(),
            ));
        }

        if self.trakt.enabled && (self.trakt.client_id.is_none() || self.trakt.access_token.is_none()) {
            return Err(ConfigError::ValidationError(
                "trakt requires client_id and access_token when enabled".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.sources.timeout_secs, 120);
        assert!(config.sources.configured().is_empty());
        assert_eq!(config.metadata.url, DEFAULT_METADATA_URL);
        assert_eq!(config.player.command, "mpv");
        assert_eq!(config.player.context(), PlayerContext::Native);
        assert!(config.trakt.client().is_none());
    }

    #[test]
    fn test_configured_sources_in_order() {
        let config = Config::parse(
            r#"
            [sources]
            torrentio = "https://torrentio.example/opts/manifest.json"
            comet = "https://comet.example/abc/manifest.json"
            aiostreams = "  "
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.configured(), vec![Backend::Comet, Backend::Torrentio]);
        assert_eq!(config.sources.timeout(), Duration::from_secs(30));
        assert_eq!(
            config.sources.client(Backend::Comet).base_url(),
            "https://comet.example/abc"
        );
        assert!(!config.sources.client(Backend::AioStreams).is_configured());
    }

    #[test]
    fn test_rejects_non_http_source() {
        let err = Config::parse(
            r#"
            [sources]
            comet = "stremio://comet.example/manifest.json"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sources.comet"));
    }

    #[test]
    fn test_trakt_needs_credentials() {
        let err = Config::parse(
            r#"
            [trakt]
            enabled = true
            client_id = "abc"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let config = Config::parse(
            r#"
            [trakt]
            enabled = true
            client_id = "abc"
            access_token = "tok"
            "#,
        )
        .unwrap();
        assert!(config.trakt.client().is_some());
    }

    #[test]
    fn test_metadata_can_be_disabled() {
        let config = Config::parse(
            r#"
            [metadata]
            enabled = false
            "#,
        )
        .unwrap();
        assert!(config.metadata_client().is_none());
    }
}
