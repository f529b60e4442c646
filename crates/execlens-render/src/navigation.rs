//! Step / loop navigation index.

use std::collections::HashMap;

use execlens_model::{LogEntry, StepResult, StepStatus};
use serde::{Deserialize, Serialize};

/// Identifies one loop iteration under a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopKey {
  pub loop_step_name: String,
  pub loop_step_index: u32,
}

/// Status and output affordances attached from step results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDecoration {
  pub status: StepStatus,
  pub display_name: Option<String>,
  /// Link to the step's output payload, if the platform provided one.
  pub results_url: Option<String>,
  /// Number of step results that matched.
  pub result_count: usize,
}

/// Logs of one loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopEntry {
  pub key: LoopKey,
  pub loop_path: Option<String>,
  /// Positions in the rendered log list, ascending.
  pub indices: Vec<usize>,
  pub decoration: Option<StepDecoration>,
}

/// Logs of one step, including those emitted inside loop iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEntry {
  pub step_name: String,
  /// Positions in the rendered log list, ascending.
  pub indices: Vec<usize>,
  /// Iterations in the order they first appear chronologically.
  pub loops: Vec<LoopEntry>,
  pub decoration: Option<StepDecoration>,
}

impl StepEntry {
  pub fn loop_entry(&self, loop_step_name: &str, loop_step_index: u32) -> Option<&LoopEntry> {
    self
      .loops
      .iter()
      .find(|l| l.key.loop_step_name == loop_step_name && l.key.loop_step_index == loop_step_index)
  }
}

/// Maps step names to the log positions that belong to them.
///
/// Steps are ordered by their first appearance in time. Log lines without a
/// step name are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepNavigationIndex {
  steps: Vec<StepEntry>,
}

impl StepNavigationIndex {
  /// Build the index from the full log list as rendered (newest first).
  pub fn build(logs: &[LogEntry]) -> Self {
    let mut steps: Vec<StepEntry> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();

    // Walk oldest to newest so entries are created in chronological order.
    for (position, log) in logs.iter().enumerate().rev() {
      let Some(step_name) = log.step_name.as_deref() else {
        continue;
      };

      let slot = *by_name.entry(step_name).or_insert_with(|| {
        steps.push(StepEntry {
          step_name: step_name.to_string(),
          indices: Vec::new(),
          loops: Vec::new(),
          decoration: None,
        });
        steps.len() - 1
      });
      let entry = &mut steps[slot];
      entry.indices.push(position);

      if let (Some(loop_step_name), Some(loop_step_index)) =
        (log.loop_step_name.as_deref(), log.loop_step_index)
      {
        let existing = entry.loops.iter_mut().find(|l| {
          l.key.loop_step_name == loop_step_name && l.key.loop_step_index == loop_step_index
        });
        match existing {
          Some(loop_entry) => {
            loop_entry.indices.push(position);
            if loop_entry.loop_path.is_none() {
              loop_entry.loop_path = log.loop_path.clone();
            }
          }
          None => entry.loops.push(LoopEntry {
            key: LoopKey {
              loop_step_name: loop_step_name.to_string(),
              loop_step_index,
            },
            loop_path: log.loop_path.clone(),
            indices: vec![position],
            decoration: None,
          }),
        }
      }
    }

    for entry in &mut steps {
      entry.indices.reverse();
      for loop_entry in &mut entry.loops {
        loop_entry.indices.reverse();
      }
    }

    Self { steps }
  }

  pub fn steps(&self) -> &[StepEntry] {
    &self.steps
  }

  pub fn get(&self, step_name: &str) -> Option<&StepEntry> {
    self.steps.iter().find(|s| s.step_name == step_name)
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  /// Whether any entry carries step-result decoration.
  pub fn is_decorated(&self) -> bool {
    self.steps.iter().any(|s| {
      s.decoration.is_some() || s.loops.iter().any(|l| l.decoration.is_some())
    })
  }
}

/// Attach step-result status and output links to a copy of `index`.
///
/// Steps match by name. Loop iterations additionally match on
/// `loop_step_index`, or on the result's loop path containing the
/// iteration's loop path. Entries without a match end up undecorated. The
/// input index is never modified, so repeated calls give the same output.
pub fn merge_step_status(index: &StepNavigationIndex, results: &[StepResult]) -> StepNavigationIndex {
  let mut by_name: HashMap<&str, Vec<&StepResult>> = HashMap::new();
  for result in results {
    by_name
      .entry(result.step_name.as_str())
      .or_default()
      .push(result);
  }

  let mut merged = index.clone();
  for entry in &mut merged.steps {
    let matches = by_name
      .get(entry.step_name.as_str())
      .map(Vec::as_slice)
      .unwrap_or(&[]);
    entry.decoration = decorate(matches);

    for loop_entry in &mut entry.loops {
      let iteration: Vec<&StepResult> = matches
        .iter()
        .copied()
        .filter(|r| matches_iteration(r, loop_entry))
        .collect();
      loop_entry.decoration = decorate(&iteration);
    }
  }
  merged
}

fn matches_iteration(result: &StepResult, loop_entry: &LoopEntry) -> bool {
  if result.loop_step_index == Some(loop_entry.key.loop_step_index) {
    return true;
  }
  match (&result.loop_path, &loop_entry.loop_path) {
    (Some(result_path), Some(path)) if !path.is_empty() => result_path.contains(path.as_str()),
    _ => false,
  }
}

fn decorate(matches: &[&StepResult]) -> Option<StepDecoration> {
  if matches.is_empty() {
    return None;
  }

  let status = if matches.iter().any(|r| r.status() == StepStatus::Failed) {
    StepStatus::Failed
  } else if matches.iter().any(|r| r.status() == StepStatus::Running) {
    StepStatus::Running
  } else {
    StepStatus::Succeeded
  };

  // Prefer the latest root-level result's output, then any result's.
  let latest = |root_only: bool| {
    matches
      .iter()
      .filter(|r| !root_only || r.loop_step_index.is_none())
      .filter(|r| r.results_url.is_some())
      .max_by_key(|r| r.started_at)
      .and_then(|r| r.results_url.clone())
  };

  Some(StepDecoration {
    status,
    display_name: matches.iter().find_map(|r| r.display_step_name.clone()),
    results_url: latest(true).or_else(|| latest(false)),
    result_count: matches.len(),
  })
}
