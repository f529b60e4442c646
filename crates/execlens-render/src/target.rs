//! Render targets.
//!
//! A target receives the already-diffed render operations. Implementations
//! decide what to do with them (keep a view model, draw a terminal, stream to
//! a UI, etc.).

use execlens_model::{ExecutionMetadata, LinkedExecution, LogEntry};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::fragments::FragmentGroup;
use crate::navigation::StepNavigationIndex;

/// Category of a user-visible error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Missing or rejected credential; the UI should offer credential setup.
  Authentication,
  Transport,
  Api,
  NotFound,
  Other,
}

/// Error shown above the results. Content already rendered stays visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBanner {
  pub kind: ErrorKind,
  pub message: String,
}

impl ErrorBanner {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
    }
  }
}

/// Receives render operations from a [`ResultsRenderer`](crate::ResultsRenderer).
pub trait RenderTarget: Send {
  /// Prepare an empty results area for a newly loaded execution.
  fn init_results(&mut self, execution: &ExecutionMetadata);

  /// Append logs that have not been rendered yet; `start_offset` is the
  /// position of the first one.
  fn append_logs(&mut self, start_offset: usize, logs: &[LogEntry]);

  fn show_progress(&mut self, loaded: usize, total: u64);

  /// Replace the navigation panel wholesale.
  fn replace_navigation(&mut self, navigation: &StepNavigationIndex);

  fn show_linked_executions(&mut self, linked: &[LinkedExecution]);

  fn mark_fragments(&mut self, groups: &[FragmentGroup]);

  fn show_error(&mut self, banner: &ErrorBanner);

  /// Remove everything, including the execution header.
  fn clear(&mut self);
}

/// Owned form of a render operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderEvent {
  ResultsInitialized {
    execution: ExecutionMetadata,
  },
  LogsAppended {
    start_offset: usize,
    logs: Vec<LogEntry>,
  },
  Progress {
    loaded: usize,
    total: u64,
  },
  NavigationReplaced {
    navigation: StepNavigationIndex,
  },
  LinkedExecutions {
    linked: Vec<LinkedExecution>,
  },
  FragmentsMarked {
    groups: Vec<FragmentGroup>,
  },
  Error {
    banner: ErrorBanner,
  },
  Cleared,
}

/// A target that forwards every operation to an unbounded channel.
///
/// Use this to drive a UI that lives in another task or process.
#[derive(Debug, Clone)]
pub struct ChannelTarget {
  // Unbounded so rendering never waits on a slow consumer; one event per page
  // or per finished cycle keeps volume low.
  sender: mpsc::UnboundedSender<RenderEvent>,
}

impl ChannelTarget {
  pub fn new(sender: mpsc::UnboundedSender<RenderEvent>) -> Self {
    Self { sender }
  }

  fn send(&self, event: RenderEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

impl RenderTarget for ChannelTarget {
  fn init_results(&mut self, execution: &ExecutionMetadata) {
    self.send(RenderEvent::ResultsInitialized {
      execution: execution.clone(),
    });
  }

  fn append_logs(&mut self, start_offset: usize, logs: &[LogEntry]) {
    self.send(RenderEvent::LogsAppended {
      start_offset,
      logs: logs.to_vec(),
    });
  }

  fn show_progress(&mut self, loaded: usize, total: u64) {
    self.send(RenderEvent::Progress { loaded, total });
  }

  fn replace_navigation(&mut self, navigation: &StepNavigationIndex) {
    self.send(RenderEvent::NavigationReplaced {
      navigation: navigation.clone(),
    });
  }

  fn show_linked_executions(&mut self, linked: &[LinkedExecution]) {
    self.send(RenderEvent::LinkedExecutions {
      linked: linked.to_vec(),
    });
  }

  fn mark_fragments(&mut self, groups: &[FragmentGroup]) {
    self.send(RenderEvent::FragmentsMarked {
      groups: groups.to_vec(),
    });
  }

  fn show_error(&mut self, banner: &ErrorBanner) {
    self.send(RenderEvent::Error {
      banner: banner.clone(),
    });
  }

  fn clear(&mut self) {
    self.send(RenderEvent::Cleared);
  }
}
