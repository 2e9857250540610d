//! Configuration management for multiverse-explorer.
//!
//! Loads config from YAML files in standard locations. The backend base URL
//! can additionally be overridden from the environment and the command line.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that overrides `backend.url`.
pub const BACKEND_URL_ENV: &str = "MULTIVERSE_BACKEND_URL";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: "https://rickandmortyapi.com/graphql".into(),
            timeout_secs: 15,
        }
    }
}

/// Which speech engine narrates generated scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    Command,
    Console,
    None,
}

impl SpeechBackend {
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "console" => Self::Console,
            "none" | "off" => Self::None,
            _ => Self::Command,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoiceConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub lang: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub engine: SpeechBackend,
    pub command: String,
    pub voices: Vec<VoiceConfig>,
    pub words_per_minute: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: SpeechBackend::Command,
            command: "espeak-ng".into(),
            voices: vec![],
            words_per_minute: 175,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub catalog: CatalogConfig,
    pub speech: SpeechConfig,
    pub start_page: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            catalog: CatalogConfig::default(),
            speech: SpeechConfig::default(),
            start_page: 1,
        }
    }
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/multiverse-explorer/config.yaml
    /// 3. /etc/multiverse-explorer/config.yaml
    ///
    /// `MULTIVERSE_BACKEND_URL` wins over the file's `backend.url`.
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = Self::load_file(path);
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            config.apply_backend_url(&url);
        }
        config
    }

    fn load_file(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/multiverse-explorer/config.yaml")),
                Some(PathBuf::from("/etc/multiverse-explorer/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }

    /// Replace the backend base URL, ignoring blank values.
    pub fn apply_backend_url(&mut self, url: &str) {
        let url = url.trim().trim_end_matches('/');
        if !url.is_empty() {
            self.backend.url = url.to_string();
        }
    }
}
