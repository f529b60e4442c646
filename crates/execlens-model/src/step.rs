use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step's execution record.
///
/// A step inside a loop produces one record per iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
  pub id: String,
  pub step_name: String,
  pub display_step_name: Option<String>,
  pub started_at: DateTime<Utc>,
  pub ended_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub is_loop_step: bool,
  #[serde(default)]
  pub is_root_result: bool,
  pub loop_path: Option<String>,
  pub loop_step_index: Option<u32>,
  pub loop_step_name: Option<String>,
  #[serde(default)]
  pub has_error: bool,
  /// Presigned, time-limited link to the step's output payload.
  pub results_url: Option<String>,
}

/// Outcome of a step as shown in the navigation panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Running,
  Succeeded,
  Failed,
}

impl StepResult {
  pub fn status(&self) -> StepStatus {
    if self.has_error {
      StepStatus::Failed
    } else if self.ended_at.is_none() {
      StepStatus::Running
    } else {
      StepStatus::Succeeded
    }
  }
}
