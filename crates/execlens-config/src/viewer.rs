use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Behaviour of the execution viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
  /// Interval between reloads while an execution is still running (default 5000).
  pub poll_interval_ms: u64,

  /// Flag adjacent log lines that together form one JSON document (default true).
  pub detect_log_fragments: bool,

  /// Upper bound on lines joined into one fragment group (default 50).
  pub max_fragment_group: usize,
}

impl ViewerConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }
}

impl Default for ViewerConfig {
  fn default() -> Self {
    Self {
      poll_interval_ms: 5000,
      detect_log_fragments: true,
      max_fragment_group: 50,
    }
  }
}
