use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One log line belonging to an execution.
///
/// The loop fields are only set for lines emitted inside a loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
  pub id: String,
  pub step_name: Option<String>,
  #[serde(default)]
  pub message: String,
  pub loop_step_name: Option<String>,
  pub loop_step_index: Option<u32>,
  pub loop_path: Option<String>,
  pub timestamp: DateTime<Utc>,
}
