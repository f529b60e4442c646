//! Incremental results renderer.

use execlens_model::{ExecutionMetadata, LinkedExecution, LogEntry, StepResult};
use tracing::{debug, warn};

use crate::fragments::{FragmentGroup, detect_fragment_groups};
use crate::navigation::{StepNavigationIndex, merge_step_status};
use crate::target::{ErrorBanner, RenderTarget};

/// Keeps track of what is on screen and sends only the difference to `T`.
pub struct ResultsRenderer<T: RenderTarget> {
  target: T,
  rendered_logs: usize,
  navigation: StepNavigationIndex,
}

impl<T: RenderTarget> ResultsRenderer<T> {
  pub fn new(target: T) -> Self {
    Self {
      target,
      rendered_logs: 0,
      navigation: StepNavigationIndex::default(),
    }
  }

  pub fn target(&self) -> &T {
    &self.target
  }

  pub fn target_mut(&mut self) -> &mut T {
    &mut self.target
  }

  /// Number of logs handed to the target since the last init.
  pub fn rendered_logs(&self) -> usize {
    self.rendered_logs
  }

  /// Navigation index as last rendered.
  pub fn navigation(&self) -> &StepNavigationIndex {
    &self.navigation
  }

  pub fn init_results_container(&mut self, execution: &ExecutionMetadata) {
    self.rendered_logs = 0;
    self.navigation = StepNavigationIndex::default();
    self.target.init_results(execution);
  }

  /// Append `new_logs`, which start at `start_offset` in the full log list.
  ///
  /// Logs below the number already rendered are skipped, so replaying a batch
  /// never renders a line twice. Returns how many logs were appended.
  pub fn render_logs_incremental(&mut self, new_logs: &[LogEntry], start_offset: usize) -> usize {
    if start_offset > self.rendered_logs {
      warn!(
        start_offset,
        rendered = self.rendered_logs,
        "log batch leaves a gap; appending anyway"
      );
    }

    let skip = self.rendered_logs.saturating_sub(start_offset);
    if skip >= new_logs.len() {
      return 0;
    }

    let fresh = &new_logs[skip..];
    let offset = start_offset + skip;
    self.target.append_logs(offset, fresh);
    self.rendered_logs = offset + fresh.len();
    debug!(appended = fresh.len(), rendered = self.rendered_logs, "logs rendered");
    fresh.len()
  }

  pub fn render_progress(&mut self, loaded: usize, total: u64) {
    self.target.show_progress(loaded, total);
  }

  /// Rebuild navigation from every log fetched so far.
  pub fn update_step_navigation_from_logs(&mut self, logs: &[LogEntry]) {
    self.navigation = StepNavigationIndex::build(logs);
    self.target.replace_navigation(&self.navigation);
  }

  /// Rebuild navigation and decorate it with step-result status and outputs.
  pub fn update_step_navigation_combined(&mut self, logs: &[LogEntry], steps: &[StepResult]) {
    let index = StepNavigationIndex::build(logs);
    self.navigation = merge_step_status(&index, steps);
    self.target.replace_navigation(&self.navigation);
  }

  /// Show the linked-execution panel. Nothing is rendered for an empty list.
  pub fn render_linked_executions(&mut self, linked: &[LinkedExecution]) {
    if linked.is_empty() {
      return;
    }
    self.target.show_linked_executions(linked);
  }

  /// Flag fragmented JSON logs. Returns the groups found.
  pub fn render_fragment_groups(&mut self, logs: &[LogEntry], max_group: usize) -> Vec<FragmentGroup> {
    let groups = detect_fragment_groups(logs, max_group);
    if !groups.is_empty() {
      self.target.mark_fragments(&groups);
    }
    groups
  }

  pub fn show_error(&mut self, banner: &ErrorBanner) {
    self.target.show_error(banner);
  }

  pub fn clear(&mut self) {
    self.rendered_logs = 0;
    self.navigation = StepNavigationIndex::default();
    self.target.clear();
  }
}
