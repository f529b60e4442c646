use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid config value for '{field}': {message}")]
  Invalid { field: String, message: String },
}
