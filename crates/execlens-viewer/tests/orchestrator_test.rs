//! Fetch cycles against a scripted API with a paused clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use execlens_api::{ApiError, ExecutionApi, StepResultFilter};
use execlens_config::{StreamConfig, ViewerConfig};
use execlens_model::{
  ExecutionLineage, ExecutionMetadata, ExecutionStatus, FlowRef, InstanceRef, LinkedExecution,
  LogEntry, Page, ReplayOutcome, StepResult,
};
use execlens_render::{
  ErrorBanner, ErrorKind, FragmentGroup, RenderTarget, StepNavigationIndex, ViewState,
};
use execlens_viewer::{FetchError, FetchOrchestrator, FetchOutcome, FetchPhase, WatchExit};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

fn base_time() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

fn metadata(id: &str) -> ExecutionMetadata {
  ExecutionMetadata {
    id: id.to_string(),
    started_at: base_time(),
    status: ExecutionStatus::Succeeded,
    step_count: 3,
    instance: InstanceRef {
      id: "inst-1".to_string(),
      name: "Acme".to_string(),
    },
    flow: FlowRef {
      name: "Sync orders".to_string(),
    },
  }
}

fn log(execution: &str, i: usize) -> LogEntry {
  LogEntry {
    id: format!("{execution}-log-{i}"),
    step_name: Some(format!("{execution}-step-{}", i % 3)),
    message: format!("message {i}"),
    loop_step_name: None,
    loop_step_index: None,
    loop_path: None,
    timestamp: base_time() + chrono::Duration::seconds(i as i64),
  }
}

fn step(execution: &str, i: usize) -> StepResult {
  StepResult {
    id: format!("{execution}-sr-{i}"),
    step_name: format!("{execution}-step-{i}"),
    display_step_name: None,
    started_at: base_time() + chrono::Duration::seconds(i as i64),
    ended_at: Some(base_time() + chrono::Duration::seconds(i as i64 + 1)),
    is_loop_step: false,
    is_root_result: true,
    loop_path: None,
    loop_step_index: None,
    loop_step_name: None,
    has_error: false,
    results_url: Some(format!("https://results.example/{execution}/{i}")),
  }
}

fn linked(execution: &str) -> LinkedExecution {
  LinkedExecution {
    id: format!("{execution}-child"),
    started_at: base_time(),
    ended_at: None,
    status: ExecutionStatus::Running,
    flow: FlowRef {
      name: "Child flow".to_string(),
    },
    lineage: ExecutionLineage::default(),
  }
}

#[derive(Clone, Default)]
struct Fixture {
  execution: Option<ExecutionMetadata>,
  /// Status reported by successive metadata calls; the last one repeats.
  statuses: Vec<ExecutionStatus>,
  logs: Vec<LogEntry>,
  steps: Vec<StepResult>,
  linked: Vec<LinkedExecution>,
  metadata_delay: Duration,
  /// Applied to every log page.
  log_delay: Duration,
  step_delay: Duration,
  metadata_error: Option<u16>,
  /// Zero-based log page that fails.
  failing_log_page: Option<usize>,
  steps_fail: bool,
  linked_fail: bool,
}

fn fixture(id: &str, log_count: usize) -> Fixture {
  Fixture {
    execution: Some(metadata(id)),
    logs: (0..log_count).rev().map(|i| log(id, i)).collect(),
    steps: (0..3).map(|i| step(id, i)).collect(),
    linked: vec![linked(id)],
    ..Fixture::default()
  }
}

fn api_error(status: u16) -> ApiError {
  if status == 401 {
    ApiError::Unauthorized {
      message: "token expired".to_string(),
    }
  } else {
    ApiError::Http {
      status,
      body: "upstream unavailable".to_string(),
    }
  }
}

fn slice_page<T: Clone>(all: &[T], cursor: Option<&str>, first: usize, total: bool) -> Page<T> {
  let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
  let end = (start + first).min(all.len());
  Page {
    items: all[start..end].to_vec(),
    end_cursor: Some(end.to_string()),
    has_next_page: end < all.len(),
    total_count: total.then_some(all.len() as u64),
  }
}

async fn delay(duration: Duration) {
  if !duration.is_zero() {
    tokio::time::sleep(duration).await;
  }
}

#[derive(Default)]
struct ScriptedApi {
  fixtures: HashMap<String, Fixture>,
  calls: Mutex<HashMap<(String, &'static str), usize>>,
  replay: Option<(String, Vec<String>)>,
}

impl ScriptedApi {
  fn with(mut self, id: &str, fixture: Fixture) -> Self {
    self.fixtures.insert(id.to_string(), fixture);
    self
  }

  fn replaying_to(mut self, execution_id: &str) -> Self {
    self.replay = Some((execution_id.to_string(), Vec::new()));
    self
  }

  fn rejecting_replay(mut self, error: &str) -> Self {
    self.replay = Some((String::new(), vec![error.to_string()]));
    self
  }

  /// Record a call and return the fixture plus how many earlier calls there were.
  fn record(&self, id: &str, call: &'static str) -> (Fixture, usize) {
    let mut calls = self.calls.lock().unwrap();
    let count = calls.entry((id.to_string(), call)).or_default();
    let previous = *count;
    *count += 1;
    (self.fixtures.get(id).cloned().unwrap_or_default(), previous)
  }

  fn calls(&self, id: &str, call: &'static str) -> usize {
    let calls = self.calls.lock().unwrap();
    calls.get(&(id.to_string(), call)).copied().unwrap_or(0)
  }
}

#[async_trait]
impl ExecutionApi for ScriptedApi {
  async fn execution(&self, id: &str) -> Result<Option<ExecutionMetadata>, ApiError> {
    let (fixture, previous) = self.record(id, "execution");
    delay(fixture.metadata_delay).await;
    if let Some(status) = fixture.metadata_error {
      return Err(api_error(status));
    }
    Ok(fixture.execution.map(|mut execution| {
      if let Some(last) = fixture.statuses.len().checked_sub(1) {
        execution.status = fixture.statuses[previous.min(last)];
      }
      execution
    }))
  }

  async fn logs_page(
    &self,
    id: &str,
    cursor: Option<&str>,
    first: usize,
  ) -> Result<Page<LogEntry>, ApiError> {
    let (fixture, previous) = self.record(id, "logs");
    delay(fixture.log_delay).await;
    if fixture.failing_log_page == Some(previous) {
      return Err(api_error(502));
    }
    Ok(slice_page(&fixture.logs, cursor, first, true))
  }

  async fn step_results_page(
    &self,
    id: &str,
    _filter: &StepResultFilter,
    cursor: Option<&str>,
    first: usize,
  ) -> Result<Page<StepResult>, ApiError> {
    let (fixture, _) = self.record(id, "steps");
    delay(fixture.step_delay).await;
    if fixture.steps_fail {
      return Err(api_error(500));
    }
    Ok(slice_page(&fixture.steps, cursor, first, false))
  }

  async fn linked_executions(&self, id: &str) -> Result<Vec<LinkedExecution>, ApiError> {
    let (fixture, _) = self.record(id, "linked");
    if fixture.linked_fail {
      return Err(ApiError::Graphql {
        message: "field not available".to_string(),
      });
    }
    Ok(fixture.linked)
  }

  async fn replay_execution(&self, id: &str) -> Result<ReplayOutcome, ApiError> {
    self.record(id, "replay");
    match &self.replay {
      Some((execution_id, errors)) if errors.is_empty() => Ok(ReplayOutcome::Started {
        execution_id: execution_id.clone(),
      }),
      Some((_, errors)) => Ok(ReplayOutcome::Rejected {
        errors: errors.clone(),
      }),
      None => Err(api_error(500)),
    }
  }
}

fn viewer(api: &Arc<ScriptedApi>) -> FetchOrchestrator<ScriptedApi, ViewState> {
  FetchOrchestrator::with_defaults(api.clone(), ViewState::new())
}

#[tokio::test(start_paused = true)]
async fn test_loads_250_logs_in_three_pages() {
  let api = Arc::new(ScriptedApi::default().with("E1", fixture("E1", 250)));
  let viewer = viewer(&api);

  let outcome = viewer.load("E1").await.unwrap();
  let summary = outcome.summary().unwrap();
  assert_eq!(summary.logs_loaded, 250);
  assert_eq!(summary.total_logs, 250);
  assert_eq!(summary.step_results, 3);
  assert_eq!(summary.linked_executions, 1);

  assert_eq!(api.calls("E1", "logs"), 3);
  assert_eq!(viewer.phase(), FetchPhase::Done);
  viewer.view(|view| {
    assert_eq!(view.execution_id(), Some("E1"));
    assert_eq!(view.logs.len(), 250);
    assert_eq!(view.append_calls, 3);
    assert_eq!(view.progress, Some((250, 250)));
    assert_eq!(view.linked.len(), 1);
    assert!(view.error.is_none());

    let navigation = view.navigation.as_ref().unwrap();
    assert_eq!(navigation.len(), 3);
    assert!(navigation.is_decorated());
    // One rebuild per page plus the combined pass.
    assert_eq!(view.navigation_builds, 4);
  });
}

#[tokio::test(start_paused = true)]
async fn test_newer_fetch_wins_over_slower_one() {
  let slow = Fixture {
    metadata_delay: Duration::from_secs(1),
    ..fixture("A", 30)
  };
  let api = Arc::new(
    ScriptedApi::default()
      .with("A", slow)
      .with("B", fixture("B", 5)),
  );
  let viewer = viewer(&api);

  let (a, b) = tokio::join!(viewer.load("A"), async {
    tokio::time::sleep(Duration::from_millis(10)).await;
    viewer.load("B").await
  });

  assert!(a.unwrap().is_superseded());
  assert!(!b.unwrap().is_superseded());
  // A never got past metadata.
  assert_eq!(api.calls("A", "logs"), 0);

  viewer.view(|view| {
    assert_eq!(view.execution_id(), Some("B"));
    assert_eq!(view.logs.len(), 5);
    assert!(view.logs.iter().all(|l| l.id.starts_with("B-")));
  });
  assert_eq!(viewer.loaded_execution().unwrap().id, "B");
}

#[tokio::test(start_paused = true)]
async fn test_switch_during_log_paging_stops_old_stream() {
  let e1 = Fixture {
    log_delay: Duration::from_secs(1),
    ..fixture("E1", 1000)
  };
  let api = Arc::new(
    ScriptedApi::default()
      .with("E1", e1)
      .with("E2", fixture("E2", 10)),
  );
  let viewer = viewer(&api);

  let (first, second) = tokio::join!(viewer.load("E1"), async {
    tokio::time::sleep(Duration::from_millis(2500)).await;
    // Two pages rendered, the third still in flight.
    viewer.view(|view| assert_eq!(view.logs.len(), 200));
    viewer.load("E2").await
  });

  assert!(first.unwrap().is_superseded());
  assert_eq!(second.unwrap().summary().unwrap().logs_loaded, 10);

  // The in-flight page was dropped and no further page was requested.
  tokio::time::sleep(Duration::from_secs(10)).await;
  assert_eq!(api.calls("E1", "logs"), 3);

  viewer.view(|view| {
    assert_eq!(view.execution_id(), Some("E2"));
    assert_eq!(view.logs.len(), 10);
    assert!(view.logs.iter().all(|l| l.id.starts_with("E2-")));
    assert_eq!(view.progress, Some((10, 10)));
  });
  assert_eq!(viewer.phase(), FetchPhase::Done);
}

#[tokio::test(start_paused = true)]
async fn test_late_step_results_of_previous_execution_are_dropped() {
  let e1 = Fixture {
    step_delay: Duration::from_secs(5),
    ..fixture("E1", 20)
  };
  let api = Arc::new(
    ScriptedApi::default()
      .with("E1", e1)
      .with("E2", fixture("E2", 10)),
  );
  let viewer = viewer(&api);

  let (first, second) = tokio::join!(viewer.load("E1"), async {
    tokio::time::sleep(Duration::from_secs(1)).await;
    viewer.view(|view| assert_eq!(view.logs.len(), 20));
    viewer.load("E2").await
  });

  assert!(first.unwrap().is_superseded());
  assert_eq!(second.unwrap().summary().unwrap().step_results, 3);

  viewer.view(|view| {
    assert_eq!(view.execution_id(), Some("E2"));
    assert!(view.logs.iter().all(|l| l.id.starts_with("E2-")));
    let navigation = view.navigation.as_ref().unwrap();
    assert!(navigation.steps().iter().all(|s| s.step_name.starts_with("E2-")));
    assert!(navigation.steps().iter().all(|s| s.decoration.is_some()));
    assert_eq!(view.navigation_builds, 2);
  });
  assert_eq!(
    viewer.step_output_url("E2-step-1", None).as_deref(),
    Some("https://results.example/E2/1")
  );
  assert_eq!(viewer.step_output_url("E1-step-1", None), None);
}

#[tokio::test(start_paused = true)]
async fn test_missing_execution_clears_view_without_fetching_logs() {
  let api = Arc::new(ScriptedApi::default().with("E1", fixture("E1", 5)));
  let viewer = viewer(&api);
  viewer.load("E1").await.unwrap();

  let err = viewer.load("missing-123").await.unwrap_err();
  assert!(matches!(err, FetchError::NotFound { ref execution_id } if execution_id == "missing-123"));

  assert_eq!(api.calls("missing-123", "logs"), 0);
  assert_eq!(viewer.phase(), FetchPhase::Aborted);
  viewer.view(|view| {
    assert!(view.execution.is_none());
    assert!(view.logs.is_empty());
    assert!(view.navigation.is_none());
    let banner = view.error.as_ref().unwrap();
    assert_eq!(banner.kind, ErrorKind::NotFound);
    assert_eq!(banner.message, "Execution not found");
  });
}

#[tokio::test(start_paused = true)]
async fn test_rejected_credential_is_reported_as_auth_error() {
  let failing = Fixture {
    metadata_error: Some(401),
    ..fixture("E1", 5)
  };
  let api = Arc::new(ScriptedApi::default().with("E1", failing));
  let viewer = viewer(&api);

  let err = viewer.load("E1").await.unwrap_err();
  assert!(err.is_auth());
  assert_eq!(viewer.phase(), FetchPhase::Failed);
  viewer.view(|view| {
    assert_eq!(view.error.as_ref().unwrap().kind, ErrorKind::Authentication);
  });
}

#[tokio::test(start_paused = true)]
async fn test_step_result_failure_leaves_navigation_undecorated() {
  let failing = Fixture {
    steps_fail: true,
    ..fixture("E1", 6)
  };
  let api = Arc::new(ScriptedApi::default().with("E1", failing));
  let viewer = viewer(&api);

  let outcome = viewer.load("E1").await.unwrap();
  assert_eq!(outcome.summary().unwrap().step_results, 0);
  viewer.view(|view| {
    assert!(view.error.is_none());
    assert_eq!(view.logs.len(), 6);
    let navigation = view.navigation.as_ref().unwrap();
    assert_eq!(navigation.len(), 3);
    assert!(!navigation.is_decorated());
  });
}

#[tokio::test(start_paused = true)]
async fn test_linked_execution_failure_shows_no_panel() {
  let failing = Fixture {
    linked_fail: true,
    ..fixture("E1", 3)
  };
  let api = Arc::new(ScriptedApi::default().with("E1", failing));
  let viewer = viewer(&api);

  let outcome = viewer.load("E1").await.unwrap();
  assert_eq!(outcome.summary().unwrap().linked_executions, 0);
  viewer.view(|view| {
    assert!(view.linked.is_empty());
    assert!(view.error.is_none());
  });
}

#[tokio::test(start_paused = true)]
async fn test_log_failure_keeps_rendered_pages() {
  let failing = Fixture {
    failing_log_page: Some(1),
    ..fixture("E1", 250)
  };
  let api = Arc::new(ScriptedApi::default().with("E1", failing));
  let viewer = viewer(&api);

  let err = viewer.load("E1").await.unwrap_err();
  assert!(matches!(err, FetchError::Logs(ApiError::Http { status: 502, .. })));
  assert_eq!(viewer.phase(), FetchPhase::Failed);
  viewer.view(|view| {
    assert_eq!(view.logs.len(), 100);
    assert_eq!(view.error.as_ref().unwrap().kind, ErrorKind::Transport);
    assert!(view.linked.is_empty());
  });
}

#[tokio::test(start_paused = true)]
async fn test_reload_reuses_linked_executions_until_execution_changes() {
  let api = Arc::new(
    ScriptedApi::default()
      .with("E1", fixture("E1", 5))
      .with("E2", fixture("E2", 5)),
  );
  let viewer = viewer(&api);

  viewer.load("E1").await.unwrap();
  viewer.fetch_results().await.unwrap();
  assert_eq!(api.calls("E1", "linked"), 1);
  assert_eq!(api.calls("E1", "logs"), 2);
  assert_eq!(api.calls("E1", "steps"), 2);
  viewer.view(|view| assert_eq!(view.linked.len(), 1));

  viewer.load("E2").await.unwrap();
  viewer.load("E1").await.unwrap();
  assert_eq!(api.calls("E1", "linked"), 2);
  assert_eq!(api.calls("E2", "linked"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fragmented_json_is_marked_after_loading() {
  let mut e1 = fixture("E1", 0);
  let lines = [r#"{"orders": [1,"#, r#" 2], "page": 1}"#, "done"];
  e1.logs = lines
    .iter()
    .enumerate()
    .rev()
    .map(|(i, message)| LogEntry {
      message: message.to_string(),
      step_name: Some("fetch".to_string()),
      ..log("E1", i)
    })
    .collect();
  let api = Arc::new(ScriptedApi::default().with("E1", e1));

  let outcome = viewer(&api).load("E1").await.unwrap();
  assert_eq!(outcome.summary().unwrap().fragment_groups, 1);

  let disabled = FetchOrchestrator::new(
    api.clone(),
    ViewState::new(),
    StreamConfig::default(),
    ViewerConfig {
      detect_log_fragments: false,
      ..ViewerConfig::default()
    },
  );
  let outcome = disabled.load("E1").await.unwrap();
  assert_eq!(outcome.summary().unwrap().fragment_groups, 0);
  disabled.view(|view| assert!(view.fragments.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_without_selection_fails() {
  let api = Arc::new(ScriptedApi::default());
  let err = viewer(&api).fetch_results().await.unwrap_err();
  assert!(matches!(err, FetchError::NoExecutionId));
}

#[tokio::test(start_paused = true)]
async fn test_watch_stops_when_execution_finishes() {
  let running = Fixture {
    statuses: vec![
      ExecutionStatus::Running,
      ExecutionStatus::Running,
      ExecutionStatus::Succeeded,
    ],
    ..fixture("E1", 5)
  };
  let api = Arc::new(ScriptedApi::default().with("E1", running));
  let viewer = viewer(&api);
  viewer.set_execution_id("E1");

  let exit = viewer
    .watch(Duration::from_secs(5), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(
    exit,
    WatchExit::Finished {
      status: ExecutionStatus::Succeeded,
      cycles: 3
    }
  );
  assert_eq!(api.calls("E1", "execution"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_watch_stops_on_cancel() {
  let running = Fixture {
    statuses: vec![ExecutionStatus::Running],
    ..fixture("E1", 5)
  };
  let api = Arc::new(ScriptedApi::default().with("E1", running));
  let viewer = viewer(&api);
  viewer.set_execution_id("E1");

  let cancel = CancellationToken::new();
  let (exit, ()) = tokio::join!(viewer.watch(Duration::from_secs(5), cancel.clone()), async {
    tokio::time::sleep(Duration::from_secs(12)).await;
    cancel.cancel();
  });

  assert_eq!(exit.unwrap(), WatchExit::Cancelled { cycles: 3 });
}

#[tokio::test(start_paused = true)]
async fn test_replay_loads_the_new_execution() {
  let api = Arc::new(
    ScriptedApi::default()
      .with("E1", fixture("E1", 5))
      .with("E2", fixture("E2", 7))
      .replaying_to("E2"),
  );
  let viewer = viewer(&api);
  viewer.load("E1").await.unwrap();

  let outcome = viewer.replay().await.unwrap();
  assert!(matches!(outcome, FetchOutcome::Completed(ref s) if s.execution.id == "E2"));
  assert_eq!(viewer.execution_id().as_deref(), Some("E2"));
  assert_eq!(api.calls("E1", "replay"), 1);
  viewer.view(|view| assert_eq!(view.logs.len(), 7));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_replay_keeps_current_execution() {
  let api = Arc::new(
    ScriptedApi::default()
      .with("E1", fixture("E1", 5))
      .rejecting_replay("executionId: execution is still running"),
  );
  let viewer = viewer(&api);
  viewer.load("E1").await.unwrap();

  let err = viewer.replay().await.unwrap_err();
  assert!(matches!(err, FetchError::ReplayRejected { ref errors } if errors.len() == 1));
  assert_eq!(viewer.execution_id().as_deref(), Some("E1"));
  viewer.view(|view| assert_eq!(view.execution_id(), Some("E1")));
}

/// Records the orchestrator phase at every navigation replacement.
#[derive(Default)]
struct PhaseRecorder {
  view: ViewState,
  phases: Option<watch::Receiver<FetchPhase>>,
  navigation_phases: Vec<FetchPhase>,
}

impl RenderTarget for PhaseRecorder {
  fn init_results(&mut self, execution: &ExecutionMetadata) {
    self.view.init_results(execution);
  }

  fn append_logs(&mut self, start_offset: usize, logs: &[LogEntry]) {
    self.view.append_logs(start_offset, logs);
  }

  fn show_progress(&mut self, loaded: usize, total: u64) {
    self.view.show_progress(loaded, total);
  }

  fn replace_navigation(&mut self, navigation: &StepNavigationIndex) {
    if let Some(phases) = &self.phases {
      self.navigation_phases.push(*phases.borrow());
    }
    self.view.replace_navigation(navigation);
  }

  fn show_linked_executions(&mut self, linked: &[LinkedExecution]) {
    self.view.show_linked_executions(linked);
  }

  fn mark_fragments(&mut self, groups: &[FragmentGroup]) {
    self.view.mark_fragments(groups);
  }

  fn show_error(&mut self, banner: &ErrorBanner) {
    self.view.show_error(banner);
  }

  fn clear(&mut self) {
    self.view.clear();
  }
}

#[tokio::test(start_paused = true)]
async fn test_combined_navigation_is_rendered_while_finalizing() {
  let api = Arc::new(ScriptedApi::default().with("E1", fixture("E1", 250)));
  let viewer = FetchOrchestrator::with_defaults(api.clone(), PhaseRecorder::default());
  let phases = viewer.phases();
  viewer.with_target(|target| target.phases = Some(phases.clone()));

  viewer.load("E1").await.unwrap();

  viewer.view(|target| {
    assert_eq!(
      target.navigation_phases,
      vec![
        FetchPhase::StreamingLogsAndSteps,
        FetchPhase::StreamingLogsAndSteps,
        FetchPhase::StreamingLogsAndSteps,
        FetchPhase::Finalizing,
      ]
    );
    assert!(target.view.navigation.as_ref().unwrap().is_decorated());
  });
  assert_eq!(*phases.borrow(), FetchPhase::Done);
}
