use serde::{Deserialize, Serialize};

/// Page sizes and filters for the paginated log and step-result streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
  /// Logs per page (default 100).
  pub log_batch_size: usize,

  /// Step results per page (default 100).
  pub step_batch_size: usize,

  /// Restrict step results to root results. `None` applies no filter.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub step_root_results_only: Option<bool>,
}

impl Default for StreamConfig {
  fn default() -> Self {
    Self {
      log_batch_size: 100,
      step_batch_size: 100,
      step_root_results_only: None,
    }
  }
}
