//! Typed queries over a [`GraphqlTransport`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use execlens_config::ApiConfig;
use execlens_model::{
  ExecutionMetadata, LinkedExecution, LogEntry, Page, ReplayOutcome, StepResult,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ApiError;
use crate::gate::RateGate;
use crate::queries;
use crate::transport::{GraphqlTransport, HttpTransport};

/// Optional filters for the step-results query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResultFilter {
  pub is_root_result: Option<bool>,
  pub loop_path: Option<String>,
  /// Lower bound on `startedAt`, used to skip unrelated history.
  pub started_at_gte: Option<DateTime<Utc>>,
}

/// The queries and mutations the execution viewer depends on.
#[async_trait]
pub trait ExecutionApi: Send + Sync {
  /// Look up one execution. `Ok(None)` when it does not exist.
  async fn execution(&self, execution_id: &str) -> Result<Option<ExecutionMetadata>, ApiError>;

  /// One page of logs, newest first.
  async fn logs_page(
    &self,
    execution_id: &str,
    cursor: Option<&str>,
    first: usize,
  ) -> Result<Page<LogEntry>, ApiError>;

  /// One page of step results, oldest first.
  async fn step_results_page(
    &self,
    execution_id: &str,
    filter: &StepResultFilter,
    cursor: Option<&str>,
    first: usize,
  ) -> Result<Page<StepResult>, ApiError>;

  /// Executions invoked by this one, in start order.
  async fn linked_executions(&self, execution_id: &str)
  -> Result<Vec<LinkedExecution>, ApiError>;

  async fn replay_execution(&self, execution_id: &str) -> Result<ReplayOutcome, ApiError>;
}

#[async_trait]
impl<A: ExecutionApi + ?Sized> ExecutionApi for Arc<A> {
  async fn execution(&self, execution_id: &str) -> Result<Option<ExecutionMetadata>, ApiError> {
    (**self).execution(execution_id).await
  }

  async fn logs_page(
    &self,
    execution_id: &str,
    cursor: Option<&str>,
    first: usize,
  ) -> Result<Page<LogEntry>, ApiError> {
    (**self).logs_page(execution_id, cursor, first).await
  }

  async fn step_results_page(
    &self,
    execution_id: &str,
    filter: &StepResultFilter,
    cursor: Option<&str>,
    first: usize,
  ) -> Result<Page<StepResult>, ApiError> {
    (**self)
      .step_results_page(execution_id, filter, cursor, first)
      .await
  }

  async fn linked_executions(
    &self,
    execution_id: &str,
  ) -> Result<Vec<LinkedExecution>, ApiError> {
    (**self).linked_executions(execution_id).await
  }

  async fn replay_execution(&self, execution_id: &str) -> Result<ReplayOutcome, ApiError> {
    (**self).replay_execution(execution_id).await
  }
}

/// [`ExecutionApi`] backed by the platform's GraphQL endpoint.
///
/// One instance per application session: its [`RateGate`] is what keeps the
/// log stream, the step-result stream and the linked-execution lookup from
/// flooding the server when they run concurrently.
pub struct PlatformClient<T: GraphqlTransport = HttpTransport> {
  transport: T,
  gate: RateGate,
}

impl PlatformClient<HttpTransport> {
  pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
    Ok(Self::new(
      HttpTransport::new(config)?,
      RateGate::new(config.rate_limit_delay()),
    ))
  }
}

impl<T: GraphqlTransport> PlatformClient<T> {
  pub fn new(transport: T, gate: RateGate) -> Self {
    Self { transport, gate }
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// Wait for the gate, send the document and decode `data`.
  async fn request<D: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<D, ApiError> {
    self.gate.wait().await;
    let data = self.transport.execute(query, variables).await?;
    Ok(serde_json::from_value(data)?)
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
  has_next_page: bool,
  end_cursor: Option<String>,
}

#[derive(Deserialize)]
struct Edge<T> {
  node: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeConnection<T> {
  total_count: Option<u64>,
  page_info: PageInfo,
  edges: Vec<Edge<T>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeConnection<T> {
  page_info: Option<PageInfo>,
  nodes: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataData {
  execution_result: Option<ExecutionMetadata>,
}

#[derive(Deserialize)]
struct LogsData {
  logs: EdgeConnection<LogEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepResultsData {
  execution_result: Option<StepResultsHolder>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepResultsHolder {
  step_results: NodeConnection<StepResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkedData {
  execution_results: NodeConnection<LinkedExecution>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayData {
  replay_execution: ReplayPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayPayload {
  instance_execution_result: Option<ReplayedExecution>,
  #[serde(default)]
  errors: Vec<FieldError>,
}

#[derive(Deserialize)]
struct ReplayedExecution {
  id: String,
}

#[derive(Deserialize)]
struct FieldError {
  field: String,
  #[serde(default)]
  messages: Vec<String>,
}

#[async_trait]
impl<T: GraphqlTransport> ExecutionApi for PlatformClient<T> {
  async fn execution(&self, execution_id: &str) -> Result<Option<ExecutionMetadata>, ApiError> {
    let data: MetadataData = self
      .request(queries::EXECUTION_METADATA, json!({ "id": execution_id }))
      .await?;
    Ok(data.execution_result)
  }

  async fn logs_page(
    &self,
    execution_id: &str,
    cursor: Option<&str>,
    first: usize,
  ) -> Result<Page<LogEntry>, ApiError> {
    let data: LogsData = self
      .request(
        queries::EXECUTION_LOGS,
        json!({ "executionId": execution_id, "first": first, "after": cursor }),
      )
      .await?;

    let logs = data.logs;
    debug!(
      execution_id,
      received = logs.edges.len(),
      has_next_page = logs.page_info.has_next_page,
      "logs page fetched"
    );

    Ok(Page {
      items: logs.edges.into_iter().map(|e| e.node).collect(),
      end_cursor: logs.page_info.end_cursor,
      has_next_page: logs.page_info.has_next_page,
      total_count: logs.total_count,
    })
  }

  async fn step_results_page(
    &self,
    execution_id: &str,
    filter: &StepResultFilter,
    cursor: Option<&str>,
    first: usize,
  ) -> Result<Page<StepResult>, ApiError> {
    let variables = json!({
      "executionId": execution_id,
      "first": first,
      "after": cursor,
      "isRootResult": filter.is_root_result,
      "loopPath": filter.loop_path,
      "startedAtGte": filter
        .started_at_gte
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
    });
    let data: StepResultsData = self
      .request(queries::EXECUTION_STEP_RESULTS, variables)
      .await?;

    let Some(holder) = data.execution_result else {
      return Ok(Page::empty());
    };
    let connection = holder.step_results;
    let (has_next_page, end_cursor) = connection
      .page_info
      .map(|p| (p.has_next_page, p.end_cursor))
      .unwrap_or((false, None));

    Ok(Page {
      items: connection.nodes,
      end_cursor,
      has_next_page,
      total_count: None,
    })
  }

  async fn linked_executions(
    &self,
    execution_id: &str,
  ) -> Result<Vec<LinkedExecution>, ApiError> {
    let data: LinkedData = self
      .request(
        queries::LINKED_EXECUTIONS,
        json!({ "executionId": execution_id }),
      )
      .await?;
    Ok(data.execution_results.nodes)
  }

  async fn replay_execution(&self, execution_id: &str) -> Result<ReplayOutcome, ApiError> {
    let data: ReplayData = self
      .request(queries::REPLAY_EXECUTION, json!({ "id": execution_id }))
      .await?;
    let payload = data.replay_execution;

    if !payload.errors.is_empty() {
      let errors = payload
        .errors
        .into_iter()
        .map(|e| format!("{}: {}", e.field, e.messages.join(", ")))
        .collect();
      return Ok(ReplayOutcome::Rejected { errors });
    }

    match payload.instance_execution_result {
      Some(result) => Ok(ReplayOutcome::Started {
        execution_id: result.id,
      }),
      None => Err(ApiError::Decode {
        message: "replay returned neither an execution nor errors".to_string(),
      }),
    }
  }
}
