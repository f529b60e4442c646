//! In-memory view model.

use execlens_model::{ExecutionMetadata, LinkedExecution, LogEntry};

use crate::fragments::FragmentGroup;
use crate::navigation::StepNavigationIndex;
use crate::target::{ErrorBanner, RenderTarget};

/// The results page as plain data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
  pub execution: Option<ExecutionMetadata>,
  /// Rendered logs, newest first.
  pub logs: Vec<LogEntry>,
  pub progress: Option<(usize, u64)>,
  /// `None` until the first navigation build.
  pub navigation: Option<StepNavigationIndex>,
  pub linked: Vec<LinkedExecution>,
  pub fragments: Vec<FragmentGroup>,
  pub error: Option<ErrorBanner>,
  /// Number of `append_logs` calls since the last init.
  pub append_calls: usize,
  /// Number of navigation replacements since the last init.
  pub navigation_builds: usize,
}

impl ViewState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn execution_id(&self) -> Option<&str> {
    self.execution.as_ref().map(|e| e.id.as_str())
  }
}

impl RenderTarget for ViewState {
  fn init_results(&mut self, execution: &ExecutionMetadata) {
    *self = ViewState {
      execution: Some(execution.clone()),
      ..ViewState::default()
    };
  }

  fn append_logs(&mut self, _start_offset: usize, logs: &[LogEntry]) {
    self.logs.extend_from_slice(logs);
    self.append_calls += 1;
  }

  fn show_progress(&mut self, loaded: usize, total: u64) {
    self.progress = Some((loaded, total));
  }

  fn replace_navigation(&mut self, navigation: &StepNavigationIndex) {
    self.navigation = Some(navigation.clone());
    self.navigation_builds += 1;
  }

  fn show_linked_executions(&mut self, linked: &[LinkedExecution]) {
    self.linked = linked.to_vec();
  }

  fn mark_fragments(&mut self, groups: &[FragmentGroup]) {
    self.fragments = groups.to_vec();
  }

  fn show_error(&mut self, banner: &ErrorBanner) {
    self.error = Some(banner.clone());
  }

  fn clear(&mut self) {
    *self = ViewState::default();
  }
}
