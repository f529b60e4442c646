//! Plain-text render target for the command line.

use std::collections::HashSet;
use std::io::Write;

use execlens_model::{ExecutionMetadata, LinkedExecution, LogEntry, StepStatus};
use execlens_render::{
  ErrorBanner, ErrorKind, FragmentGroup, RenderTarget, StepDecoration, StepNavigationIndex,
};

/// Writes logs as they arrive. Navigation is kept and printed on request,
/// since it is rebuilt after every page.
///
/// Output is append-only, so reloading the execution already on screen only
/// prints what has not been printed yet: no second header, and no log line,
/// linked execution or fragment twice.
pub struct TerminalTarget<W: Write + Send> {
  out: W,
  navigation: Option<StepNavigationIndex>,
  show_progress: bool,
  execution_id: Option<String>,
  printed_logs: HashSet<String>,
  printed_linked: HashSet<String>,
  printed_fragments: HashSet<String>,
}

impl<W: Write + Send> TerminalTarget<W> {
  pub fn new(out: W, show_progress: bool) -> Self {
    Self {
      out,
      navigation: None,
      show_progress,
      execution_id: None,
      printed_logs: HashSet::new(),
      printed_linked: HashSet::new(),
      printed_fragments: HashSet::new(),
    }
  }

  fn forget_printed(&mut self) {
    self.execution_id = None;
    self.printed_logs.clear();
    self.printed_linked.clear();
    self.printed_fragments.clear();
  }

  /// Print the step overview from the last navigation build.
  pub fn print_navigation(&mut self) {
    let Some(navigation) = &self.navigation else {
      return;
    };
    if navigation.is_empty() {
      return;
    }

    let _ = writeln!(self.out, "\nSteps:");
    for step in navigation.steps() {
      let _ = writeln!(
        self.out,
        "  {:<9} {} ({} logs){}",
        status_label(step.decoration.as_ref()),
        step
          .decoration
          .as_ref()
          .and_then(|d| d.display_name.as_deref())
          .unwrap_or(&step.step_name),
        step.indices.len(),
        output_suffix(step.decoration.as_ref()),
      );
      for iteration in &step.loops {
        let _ = writeln!(
          self.out,
          "    {:<9} {}[{}] ({} logs){}",
          status_label(iteration.decoration.as_ref()),
          iteration.key.loop_step_name,
          iteration.key.loop_step_index,
          iteration.indices.len(),
          output_suffix(iteration.decoration.as_ref()),
        );
      }
    }
  }

  #[cfg(test)]
  fn into_inner(self) -> W {
    self.out
  }
}

fn status_label(decoration: Option<&StepDecoration>) -> &'static str {
  match decoration.map(|d| d.status) {
    Some(StepStatus::Succeeded) => "ok",
    Some(StepStatus::Failed) => "FAILED",
    Some(StepStatus::Running) => "running",
    None => "-",
  }
}

fn output_suffix(decoration: Option<&StepDecoration>) -> String {
  decoration
    .and_then(|d| d.results_url.as_deref())
    .map(|url| format!(" -> {url}"))
    .unwrap_or_default()
}

impl<W: Write + Send> RenderTarget for TerminalTarget<W> {
  fn init_results(&mut self, execution: &ExecutionMetadata) {
    self.navigation = None;
    if self.execution_id.as_deref() == Some(execution.id.as_str()) {
      return;
    }

    self.forget_printed();
    self.execution_id = Some(execution.id.clone());
    let _ = writeln!(
      self.out,
      "{} | {} | {} | {} | started {}",
      execution.id,
      execution.flow.name,
      execution.instance.name,
      execution.status,
      execution.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
  }

  fn append_logs(&mut self, _start_offset: usize, logs: &[LogEntry]) {
    for log in logs {
      if !self.printed_logs.insert(log.id.clone()) {
        continue;
      }
      let step = match (&log.step_name, &log.loop_step_index) {
        (Some(step), Some(index)) => format!("{step}[{index}]"),
        (Some(step), None) => step.clone(),
        (None, _) => "-".to_string(),
      };
      let _ = writeln!(
        self.out,
        "{} [{}] {}",
        log.timestamp.format("%H:%M:%S%.3f"),
        step,
        log.message
      );
    }
  }

  fn show_progress(&mut self, loaded: usize, total: u64) {
    if self.show_progress {
      eprintln!("loaded {loaded} of {total} logs");
    }
  }

  fn replace_navigation(&mut self, navigation: &StepNavigationIndex) {
    self.navigation = Some(navigation.clone());
  }

  fn show_linked_executions(&mut self, linked: &[LinkedExecution]) {
    let fresh: Vec<_> = linked
      .iter()
      .filter(|execution| self.printed_linked.insert(execution.id.clone()))
      .collect();
    if fresh.is_empty() {
      return;
    }

    let _ = writeln!(self.out, "\nLinked executions:");
    for execution in fresh {
      let invoked_by = execution
        .lineage
        .invoked_by_id()
        .map(|id| format!(" (invoked by {id})"))
        .unwrap_or_default();
      let _ = writeln!(
        self.out,
        "  {} | {} | {}{}",
        execution.id, execution.flow.name, execution.status, invoked_by
      );
    }
  }

  fn mark_fragments(&mut self, groups: &[FragmentGroup]) {
    for group in groups {
      if !self.printed_fragments.insert(group.combined.to_string()) {
        continue;
      }
      let combined = serde_json::to_string_pretty(&group.combined)
        .unwrap_or_else(|_| group.combined.to_string());
      let _ = writeln!(
        self.out,
        "\nLog lines {}..={} form one JSON document:\n{}",
        group.first_position, group.last_position, combined
      );
    }
  }

  fn show_error(&mut self, banner: &ErrorBanner) {
    eprintln!("error: {}", banner.message);
    if banner.kind == ErrorKind::Authentication {
      eprintln!(
        "hint: set {} or pass --token",
        execlens_config::API_TOKEN_ENV
      );
    }
  }

  fn clear(&mut self) {
    self.navigation = None;
    self.forget_printed();
  }
}
