use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Access to the platform's GraphQL endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// GraphQL endpoint URL.
  pub endpoint: String,

  /// Bearer credential. Requests fail before being sent when absent.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_token: Option<String>,

  /// Minimum spacing between outbound requests, in milliseconds (default 250).
  pub rate_limit_delay_ms: u64,

  /// Per-request timeout. `None` keeps the HTTP client's default.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
}

impl ApiConfig {
  pub fn rate_limit_delay(&self) -> Duration {
    Duration::from_millis(self.rate_limit_delay_ms)
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_ms.map(Duration::from_millis)
  }
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      endpoint: "https://app.prismatic.io/api".to_string(),
      api_token: None,
      rate_limit_delay_ms: 250,
      timeout_ms: None,
    }
  }
}
