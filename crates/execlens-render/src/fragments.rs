//! Detection of JSON documents split across consecutive log lines.
//!
//! Large payloads are sometimes logged in several chunks. A chunk opens a
//! group when it starts like a JSON object or array but does not parse on its
//! own; following chunks from the same step are appended, in time order, until
//! the concatenation parses.

use std::ops::RangeInclusive;

use execlens_model::LogEntry;
use serde::{Deserialize, Serialize};

/// Adjacent log lines that together form one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentGroup {
  /// Positions in the rendered (newest-first) log list.
  pub first_position: usize,
  pub last_position: usize,
  /// The document obtained by joining the fragments oldest first.
  pub combined: serde_json::Value,
}

impl FragmentGroup {
  pub fn positions(&self) -> RangeInclusive<usize> {
    self.first_position..=self.last_position
  }

  pub fn line_count(&self) -> usize {
    self.last_position - self.first_position + 1
  }
}

fn opens_fragment(message: &str) -> bool {
  let trimmed = message.trim_start();
  (trimmed.starts_with('{') || trimmed.starts_with('['))
    && serde_json::from_str::<serde_json::Value>(trimmed).is_err()
}

/// Find fragment groups in `logs` (newest first), joining at most `max_group`
/// lines per group.
pub fn detect_fragment_groups(logs: &[LogEntry], max_group: usize) -> Vec<FragmentGroup> {
  let mut groups = Vec::new();
  if logs.len() < 2 || max_group < 2 {
    return groups;
  }

  // Oldest line sits at the highest position.
  let mut position = logs.len();
  while position > 0 {
    position -= 1;
    let opener = &logs[position];
    if !opens_fragment(&opener.message) {
      continue;
    }

    let mut buffer = opener.message.trim_start().to_string();
    let mut next = position;
    let mut found = None;
    while next > 0 && position - next + 1 < max_group {
      next -= 1;
      let fragment = &logs[next];
      if fragment.step_name != opener.step_name {
        break;
      }
      buffer.push_str(&fragment.message);
      if let Ok(value) = serde_json::from_str::<serde_json::Value>(&buffer) {
        found = Some(value);
        break;
      }
    }

    if let Some(combined) = found {
      groups.push(FragmentGroup {
        first_position: next,
        last_position: position,
        combined,
      });
      // Continue with the line just newer than the group.
      position = next;
    }
  }

  groups
}
