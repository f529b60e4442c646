//! Execlens Config
//!
//! Serializable configuration for the execution viewer. Every option bag the
//! dashboard used to pass around is an explicit struct here, each field with
//! its default stated up front:
//!
//! - [`ApiConfig`]: GraphQL endpoint, bearer credential, request spacing
//! - [`StreamConfig`]: page sizes for the log and step-result streams
//! - [`ViewerConfig`]: polling and log-fragment detection
//!
//! Configuration is loaded from a JSON file and overlaid with environment
//! variables (`EXECLENS_ENDPOINT`, `EXECLENS_API_TOKEN`).

mod api;
mod error;
mod stream;
mod viewer;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use api::ApiConfig;
pub use error::ConfigError;
pub use stream::StreamConfig;
pub use viewer::ViewerConfig;

pub const ENDPOINT_ENV: &str = "EXECLENS_ENDPOINT";
pub const API_TOKEN_ENV: &str = "EXECLENS_API_TOKEN";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExeclensConfig {
  pub api: ApiConfig,
  pub streams: StreamConfig,
  pub viewer: ViewerConfig,
}

impl ExeclensConfig {
  /// Default location: `<config dir>/execlens/config.json`.
  pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("execlens").join("config.json"))
  }

  /// Read and validate a JSON configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let config: ExeclensConfig =
      serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
      })?;
    config.validate()?;
    Ok(config)
  }

  /// Like [`load`](Self::load), but a missing file yields the defaults.
  pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
    if path.exists() {
      Self::load(path)
    } else {
      Ok(Self::default())
    }
  }

  /// Overlay values from the process environment.
  pub fn apply_env(&mut self) {
    self.apply_env_from(|key| std::env::var(key).ok());
  }

  /// Overlay values from an arbitrary variable lookup.
  pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
      self.api.endpoint = endpoint;
    }
    if let Some(token) = lookup(API_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
      self.api.api_token = Some(token);
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.api.endpoint.trim().is_empty() {
      return Err(ConfigError::Invalid {
        field: "api.endpoint".to_string(),
        message: "must not be empty".to_string(),
      });
    }
    if self.streams.log_batch_size == 0 {
      return Err(ConfigError::Invalid {
        field: "streams.log_batch_size".to_string(),
        message: "must be greater than zero".to_string(),
      });
    }
    if self.streams.step_batch_size == 0 {
      return Err(ConfigError::Invalid {
        field: "streams.step_batch_size".to_string(),
        message: "must be greater than zero".to_string(),
      });
    }
    if self.viewer.max_fragment_group < 2 {
      return Err(ConfigError::Invalid {
        field: "viewer.max_fragment_group".to_string(),
        message: "must be at least 2".to_string(),
      });
    }
    Ok(())
  }
}
