use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an execution run as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
  Succeeded,
  Failed,
  Running,
  Pending,
  Canceled,
  Error,
}

impl ExecutionStatus {
  /// Whether the run can still produce logs and step results.
  pub fn is_active(self) -> bool {
    matches!(self, ExecutionStatus::Running | ExecutionStatus::Pending)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ExecutionStatus::Succeeded => "SUCCEEDED",
      ExecutionStatus::Failed => "FAILED",
      ExecutionStatus::Running => "RUNNING",
      ExecutionStatus::Pending => "PENDING",
      ExecutionStatus::Canceled => "CANCELED",
      ExecutionStatus::Error => "ERROR",
    }
  }
}

impl std::fmt::Display for ExecutionStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRef {
  pub id: String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRef {
  pub name: String,
}

/// Identifies one execution run.
///
/// Immutable once fetched; the viewer re-fetches it wholesale on each load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
  pub id: String,
  pub started_at: DateTime<Utc>,
  pub status: ExecutionStatus,
  #[serde(default)]
  pub step_count: u32,
  pub instance: InstanceRef,
  pub flow: FlowRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRef {
  pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokedBy {
  pub execution: Option<ExecutionRef>,
}

/// Position of an execution in a chain of flow invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLineage {
  #[serde(default)]
  pub has_children: bool,
  pub invoked_by: Option<InvokedBy>,
}

impl ExecutionLineage {
  /// Id of the execution that invoked this one, if any.
  pub fn invoked_by_id(&self) -> Option<&str> {
    self
      .invoked_by
      .as_ref()
      .and_then(|i| i.execution.as_ref())
      .map(|e| e.id.as_str())
  }
}

/// An execution connected to the loaded one by an "invoked by" relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedExecution {
  pub id: String,
  pub started_at: DateTime<Utc>,
  pub ended_at: Option<DateTime<Utc>>,
  pub status: ExecutionStatus,
  pub flow: FlowRef,
  #[serde(default)]
  pub lineage: ExecutionLineage,
}

/// Result of asking the platform to replay an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayOutcome {
  /// A new execution was started.
  Started { execution_id: String },
  /// The mutation returned field-level errors instead of a new execution.
  Rejected { errors: Vec<String> },
}
