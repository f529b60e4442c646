//! Step-result stream.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use execlens_api::{ApiError, ExecutionApi, StepResultFilter};
use execlens_config::StreamConfig;
use execlens_model::{Page, StepResult};
use futures::{Stream, TryStreamExt};

use crate::paginate::{PageSource, Snapshot, paginate};

/// Options for [`step_result_stream`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepStreamOptions {
  /// Step results per page (default 100).
  pub batch_size: usize,
  pub filter: StepResultFilter,
}

impl StepStreamOptions {
  pub fn new(batch_size: usize) -> Self {
    Self {
      batch_size,
      filter: StepResultFilter::default(),
    }
  }

  /// Skip results that started before the execution did.
  pub fn started_since(mut self, started_at: DateTime<Utc>) -> Self {
    self.filter.started_at_gte = Some(started_at);
    self
  }

  pub fn root_results(mut self, is_root_result: Option<bool>) -> Self {
    self.filter.is_root_result = is_root_result;
    self
  }

  pub fn loop_path(mut self, loop_path: impl Into<String>) -> Self {
    self.filter.loop_path = Some(loop_path.into());
    self
  }
}

impl Default for StepStreamOptions {
  fn default() -> Self {
    Self::new(100)
  }
}

impl From<&StreamConfig> for StepStreamOptions {
  fn from(config: &StreamConfig) -> Self {
    Self::new(config.step_batch_size).root_results(config.step_root_results_only)
  }
}

/// Step results of one execution as a [`PageSource`], oldest first.
pub struct StepResultSource<A> {
  api: A,
  execution_id: String,
  filter: StepResultFilter,
}

impl<A> StepResultSource<A> {
  pub fn new(api: A, execution_id: impl Into<String>, filter: StepResultFilter) -> Self {
    Self {
      api,
      execution_id: execution_id.into(),
      filter,
    }
  }
}

#[async_trait]
impl<A: ExecutionApi> PageSource<StepResult> for StepResultSource<A> {
  async fn fetch_page(
    &self,
    cursor: Option<String>,
    first: usize,
  ) -> Result<Page<StepResult>, ApiError> {
    self
      .api
      .step_results_page(&self.execution_id, &self.filter, cursor.as_deref(), first)
      .await
  }
}

/// Step results fetched so far.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSnapshot {
  pub steps: Arc<Vec<StepResult>>,
  pub page_start: usize,
  pub loaded_count: usize,
  pub has_more: bool,
  pub is_complete: bool,
}

impl From<Snapshot<StepResult>> for StepSnapshot {
  fn from(s: Snapshot<StepResult>) -> Self {
    Self {
      steps: s.items,
      page_start: s.page_start,
      loaded_count: s.loaded_count,
      has_more: s.has_more,
      is_complete: s.is_complete,
    }
  }
}

/// Stream an execution's step results, oldest first.
pub fn step_result_stream<A>(
  api: A,
  execution_id: impl Into<String>,
  options: StepStreamOptions,
) -> impl Stream<Item = Result<StepSnapshot, ApiError>> + Send
where
  A: ExecutionApi + 'static,
{
  paginate(
    StepResultSource::new(api, execution_id, options.filter),
    options.batch_size,
  )
  .map_ok(StepSnapshot::from)
}
