//! Execution log stream.

use std::sync::Arc;

use async_trait::async_trait;
use execlens_api::{ApiError, ExecutionApi};
use execlens_config::StreamConfig;
use execlens_model::{LogEntry, Page};
use futures::{Stream, TryStreamExt};

use crate::paginate::{PageSource, Snapshot, paginate};

/// Options for [`log_stream`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogStreamOptions {
  /// Logs per page (default 100).
  pub batch_size: usize,
}

impl Default for LogStreamOptions {
  fn default() -> Self {
    Self { batch_size: 100 }
  }
}

impl From<&StreamConfig> for LogStreamOptions {
  fn from(config: &StreamConfig) -> Self {
    Self {
      batch_size: config.log_batch_size,
    }
  }
}

/// Logs of one execution as a [`PageSource`], newest first.
pub struct LogSource<A> {
  api: A,
  execution_id: String,
}

impl<A> LogSource<A> {
  pub fn new(api: A, execution_id: impl Into<String>) -> Self {
    Self {
      api,
      execution_id: execution_id.into(),
    }
  }
}

#[async_trait]
impl<A: ExecutionApi> PageSource<LogEntry> for LogSource<A> {
  async fn fetch_page(
    &self,
    cursor: Option<String>,
    first: usize,
  ) -> Result<Page<LogEntry>, ApiError> {
    self
      .api
      .logs_page(&self.execution_id, cursor.as_deref(), first)
      .await
  }
}

/// Logs fetched so far.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSnapshot {
  /// Newest first, in fetch order.
  pub logs: Arc<Vec<LogEntry>>,
  /// Offset of the logs added by the latest page.
  pub page_start: usize,
  pub loaded_count: usize,
  /// Total reported by the first page. A still-running execution may have
  /// gained logs since; this value is not refreshed mid-stream.
  pub total_count: u64,
  pub has_more: bool,
  pub is_complete: bool,
}

impl LogSnapshot {
  pub fn new_logs(&self) -> &[LogEntry] {
    &self.logs[self.page_start..]
  }
}

impl From<Snapshot<LogEntry>> for LogSnapshot {
  fn from(s: Snapshot<LogEntry>) -> Self {
    let total_count = s.total_count.unwrap_or(s.loaded_count as u64);
    Self {
      logs: s.items,
      page_start: s.page_start,
      loaded_count: s.loaded_count,
      total_count,
      has_more: s.has_more,
      is_complete: s.is_complete,
    }
  }
}

/// Stream an execution's logs, newest first.
pub fn log_stream<A>(
  api: A,
  execution_id: impl Into<String>,
  options: LogStreamOptions,
) -> impl Stream<Item = Result<LogSnapshot, ApiError>> + Send
where
  A: ExecutionApi + 'static,
{
  paginate(LogSource::new(api, execution_id), options.batch_size).map_ok(LogSnapshot::from)
}
