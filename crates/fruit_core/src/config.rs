//! Client configuration.
//!
//! Values come from an optional TOML file and are then overridden by the
//! environment:
//!
//! ```toml
//! endpoint = "https://example.ngrok.app/predict"
//! field_name = "image"
//! submit_mode = "batch"      # or "per_image"
//! fill_missing_grade = false
//! camera_url = "http://192.168.1.20:8080/shot.jpg"
//!
//! [drive]
//! client_id = "..."
//! api_key = "..."
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_CONFIG_PATH: &str = "FRUIT_QUALITY_CONFIG";
pub const ENV_ENDPOINT: &str = "PREDICTION_API_URL";
pub const ENV_DRIVE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
pub const ENV_DRIVE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_CAMERA_URL: &str = "FRUIT_CAMERA_URL";

pub const CONFIG_FILE_NAME: &str = "fruit_quality.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("missing setting: {0}")]
    Missing(&'static str),
}

/// How a batch of images is sent to the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// All images in one multipart request.
    #[default]
    Batch,
    /// One request per image, sent one after the other.
    PerImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveConfig {
    pub client_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prediction endpoint URL.
    pub endpoint: String,
    /// Multipart field every image is sent under.
    pub field_name: String,
    pub submit_mode: SubmitMode,
    /// Request timeout. `None` leaves it to the transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Derive a grade locally when the service omits one.
    pub fill_missing_grade: bool,
    /// Snapshot URL of the camera used for captures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive: Option<DriveConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            field_name: "image".to_string(),
            submit_mode: SubmitMode::default(),
            timeout_secs: None,
            fill_missing_grade: false,
            camera_url: None,
            drive: None,
        }
    }
}

impl Config {
    /// Load from `path` if it exists, apply environment overrides and
    /// validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let cfg = Self::resolve(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Like [`Config::load`] without validation, for front-ends that let the
    /// user fill in missing settings.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from);
        let path = env_path.as_deref().or(path);
        let mut cfg = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            Some(p) => {
                tracing::debug!("no config file at {}, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        let write = |path: &Path| -> std::io::Result<()> {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(path, raw.as_bytes())
        };
        write(path).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from environment-style lookups. Empty values are
    /// ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_ENDPOINT) {
            self.endpoint = url;
        }
        if let Some(url) = get(ENV_CAMERA_URL) {
            self.camera_url = Some(url);
        }
        let client_id = get(ENV_DRIVE_CLIENT_ID);
        let api_key = get(ENV_DRIVE_API_KEY);
        if client_id.is_some() || api_key.is_some() {
            let current = self.drive.take();
            let (old_id, old_key) = current
                .map(|d| (d.client_id, d.api_key))
                .unwrap_or_default();
            self.drive = Some(DriveConfig {
                client_id: client_id.unwrap_or(old_id),
                api_key: api_key.unwrap_or(old_key),
            });
        }
    }

    /// Presence checks only; values are not otherwise interpreted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("endpoint"));
        }
        if self.field_name.trim().is_empty() {
            return Err(ConfigError::Missing("field_name"));
        }
        if let Some(drive) = &self.drive {
            if drive.client_id.trim().is_empty() {
                return Err(ConfigError::Missing("drive.client_id"));
            }
            if drive.api_key.trim().is_empty() {
                return Err(ConfigError::Missing("drive.api_key"));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
