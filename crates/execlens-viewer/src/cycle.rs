//! One fetch cycle.
//!
//! A cycle runs in three phases:
//!
//! 1. Metadata. Not found clears the view and stops before any log request.
//! 2. Logs, step results and linked executions, concurrently. Logs are
//!    rendered page by page; the other two are buffered.
//! 3. One synchronous finalize pass: navigation merged with step status, the
//!    linked-execution panel and fragment marking.
//!
//! Every render mutation goes through [`FetchOrchestrator::commit`], which
//! drops it when a newer cycle has started.

use std::pin::pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use execlens_api::ExecutionApi;
use execlens_model::{ExecutionMetadata, LinkedExecution, LogEntry, StepResult};
use execlens_render::RenderTarget;
use execlens_stream::{LogStreamOptions, StepStreamOptions, log_stream, step_result_stream};
use futures::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::error::FetchError;
use crate::orchestrator::{FetchOrchestrator, FetchPhase, Session};

/// How a `fetch_results` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
  /// The execution is fully rendered.
  Completed(CycleSummary),
  /// A newer cycle started first; this one left the view alone.
  Superseded { generation: u64 },
}

impl FetchOutcome {
  pub fn summary(&self) -> Option<&CycleSummary> {
    match self {
      FetchOutcome::Completed(summary) => Some(summary),
      FetchOutcome::Superseded { .. } => None,
    }
  }

  pub fn is_superseded(&self) -> bool {
    matches!(self, FetchOutcome::Superseded { .. })
  }
}

/// What a completed cycle loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
  pub generation: u64,
  pub execution: ExecutionMetadata,
  pub logs_loaded: usize,
  pub total_logs: u64,
  pub step_results: usize,
  pub linked_executions: usize,
  pub fragment_groups: usize,
}

enum Stage<V> {
  Ready(V),
  Superseded,
}

#[derive(Default)]
struct LoadedLogs {
  logs: Arc<Vec<LogEntry>>,
  total: u64,
}

pub(crate) struct FetchCycle<'a, A, T: RenderTarget> {
  orchestrator: &'a FetchOrchestrator<A, T>,
  generation: u64,
  execution_id: String,
}

impl<'a, A, T> FetchCycle<'a, A, T>
where
  A: ExecutionApi + 'static,
  T: RenderTarget,
{
  pub fn new(orchestrator: &'a FetchOrchestrator<A, T>, generation: u64, execution_id: String) -> Self {
    Self {
      orchestrator,
      generation,
      execution_id,
    }
  }

  #[instrument(
    name = "fetch_results",
    skip(self),
    fields(execution_id = %self.execution_id, generation = self.generation)
  )]
  pub async fn run(self) -> Result<FetchOutcome, FetchError> {
    info!("fetch started");

    let execution = match self.load_metadata().await? {
      Stage::Ready(execution) => execution,
      Stage::Superseded => return Ok(self.superseded()),
    };

    let initialized = self.commit(|s| {
      s.execution = Some(execution.clone());
      s.set_phase(FetchPhase::StreamingLogsAndSteps);
      s.renderer.init_results_container(&execution);
    });
    if !initialized {
      return Ok(self.superseded());
    }

    let (logs, steps, linked) = tokio::join!(
      self.stream_logs(),
      self.collect_step_results(execution.started_at),
      self.linked_executions(),
    );

    let logs = match logs? {
      Stage::Ready(logs) => logs,
      Stage::Superseded => return Ok(self.superseded()),
    };
    let (Stage::Ready(steps), Stage::Ready(linked)) = (steps, linked) else {
      return Ok(self.superseded());
    };

    self.finalize(execution, logs, steps, linked)
  }

  async fn load_metadata(&self) -> Result<Stage<ExecutionMetadata>, FetchError> {
    let error = match self.orchestrator.api.execution(&self.execution_id).await {
      Ok(Some(execution)) => {
        debug!(status = %execution.status, "metadata loaded");
        return Ok(Stage::Ready(execution));
      }
      Ok(None) => FetchError::NotFound {
        execution_id: self.execution_id.clone(),
      },
      Err(e) => FetchError::Metadata(e),
    };

    self.fail(error).map(|()| Stage::Superseded)
  }

  /// Render log pages as they arrive.
  async fn stream_logs(&self) -> Result<Stage<LoadedLogs>, FetchError> {
    let options = LogStreamOptions::from(&self.orchestrator.streams);
    let mut pages = pin!(log_stream(
      self.orchestrator.api.clone(),
      self.execution_id.clone(),
      options
    ));
    let mut loaded = LoadedLogs::default();
    let mut rendered = 0;

    loop {
      if !self.is_current() {
        return Ok(Stage::Superseded);
      }
      let snapshot = match pages.next().await {
        None => break,
        Some(Ok(snapshot)) => snapshot,
        Some(Err(e)) => {
          warn!(error = %e, loaded = rendered, "log stream failed");
          return self.fail(FetchError::Logs(e)).map(|()| Stage::Superseded);
        }
      };

      let applied = self.commit(|s| {
        s.renderer
          .render_logs_incremental(snapshot.new_logs(), snapshot.page_start);
        s.renderer
          .render_progress(snapshot.loaded_count, snapshot.total_count);
        s.renderer.update_step_navigation_from_logs(&snapshot.logs);
      });
      if !applied {
        return Ok(Stage::Superseded);
      }

      debug!(
        loaded = snapshot.loaded_count,
        total = snapshot.total_count,
        "log page rendered"
      );
      rendered = snapshot.loaded_count;
      // Earlier snapshots are dropped so the stream can extend its log list
      // in place.
      if snapshot.is_complete {
        loaded = LoadedLogs {
          total: snapshot.total_count,
          logs: snapshot.logs,
        };
      }
    }

    Ok(Stage::Ready(loaded))
  }

  /// Collect step results without rendering. A failure leaves the navigation
  /// undecorated.
  async fn collect_step_results(&self, started_at: DateTime<Utc>) -> Stage<Vec<StepResult>> {
    let options = StepStreamOptions::from(&self.orchestrator.streams).started_since(started_at);
    let mut pages = pin!(step_result_stream(
      self.orchestrator.api.clone(),
      self.execution_id.clone(),
      options
    ));
    let mut steps = Vec::new();

    loop {
      if !self.is_current() {
        return Stage::Superseded;
      }
      match pages.next().await {
        None => break,
        Some(Ok(snapshot)) if snapshot.is_complete => steps = Arc::unwrap_or_clone(snapshot.steps),
        Some(Ok(_)) => {}
        Some(Err(e)) => {
          warn!(error = %e, "step results unavailable, navigation will not show status");
          return Stage::Ready(Vec::new());
        }
      }
    }

    let execution_id = &self.execution_id;
    let cached = self.commit(|s| s.cache.insert_step_results(execution_id, steps.clone()));
    if !cached {
      return Stage::Superseded;
    }
    Stage::Ready(steps)
  }

  /// Linked executions, from cache when this execution was loaded before.
  async fn linked_executions(&self) -> Stage<Vec<LinkedExecution>> {
    let cached = self
      .orchestrator
      .lock()
      .cache
      .linked(&self.execution_id)
      .map(<[LinkedExecution]>::to_vec);
    if let Some(linked) = cached {
      debug!(count = linked.len(), "linked executions from cache");
      return Stage::Ready(linked);
    }

    match self
      .orchestrator
      .api
      .linked_executions(&self.execution_id)
      .await
    {
      Ok(linked) => {
        let execution_id = &self.execution_id;
        if !self.commit(|s| s.cache.insert_linked(execution_id, linked.clone())) {
          return Stage::Superseded;
        }
        Stage::Ready(linked)
      }
      Err(e) => {
        warn!(error = %e, "linked executions unavailable");
        Stage::Ready(Vec::new())
      }
    }
  }

  fn finalize(
    &self,
    execution: ExecutionMetadata,
    logs: LoadedLogs,
    steps: Vec<StepResult>,
    linked: Vec<LinkedExecution>,
  ) -> Result<FetchOutcome, FetchError> {
    let detect_fragments = self.orchestrator.viewer.detect_log_fragments && logs.logs.len() > 1;
    let max_group = self.orchestrator.viewer.max_fragment_group;
    let mut fragment_groups = 0;

    if !self.commit(|s| s.set_phase(FetchPhase::Finalizing)) {
      return Ok(self.superseded());
    }

    let committed = self.commit(|s| {
      s.renderer
        .update_step_navigation_combined(&logs.logs, &steps);
      s.renderer.render_linked_executions(&linked);
      if detect_fragments {
        fragment_groups = s
          .renderer
          .render_fragment_groups(&logs.logs, max_group)
          .len();
      }
      s.set_phase(FetchPhase::Done);
    });
    if !committed {
      return Ok(self.superseded());
    }

    info!(
      logs = logs.logs.len(),
      step_results = steps.len(),
      linked = linked.len(),
      fragment_groups,
      "fetch completed"
    );

    Ok(FetchOutcome::Completed(CycleSummary {
      generation: self.generation,
      execution,
      logs_loaded: logs.logs.len(),
      total_logs: logs.total,
      step_results: steps.len(),
      linked_executions: linked.len(),
      fragment_groups,
    }))
  }

  /// Show `error` if this cycle is still current. `Ok(())` means the cycle was
  /// superseded and the error is dropped.
  fn fail(&self, error: FetchError) -> Result<(), FetchError> {
    let banner = error.banner();
    let not_found = matches!(error, FetchError::NotFound { .. });

    let shown = self.commit(|s| {
      if not_found {
        // Content from the previous execution must not stay on screen.
        s.renderer.clear();
        s.set_phase(FetchPhase::Aborted);
      } else {
        s.set_phase(FetchPhase::Failed);
      }
      s.renderer.show_error(&banner);
    });

    if shown {
      warn!(error = %error, "fetch failed");
      Err(error)
    } else {
      Ok(())
    }
  }

  fn superseded(&self) -> FetchOutcome {
    debug!("fetch superseded by a newer cycle");
    FetchOutcome::Superseded {
      generation: self.generation,
    }
  }

  fn is_current(&self) -> bool {
    self.orchestrator.is_current(self.generation)
  }

  fn commit(&self, f: impl FnOnce(&mut Session<T>)) -> bool {
    self.orchestrator.commit(self.generation, f)
  }
}
