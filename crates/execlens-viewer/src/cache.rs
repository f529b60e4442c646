//! Per-execution caches.
//!
//! Entries are keyed by execution id. The orchestrator clears everything when
//! a different execution is loaded, so at most one id is populated at a time.

use std::collections::HashMap;

use execlens_model::{LinkedExecution, StepResult};

#[derive(Debug, Default)]
pub(crate) struct ExecutionCache {
  step_results: HashMap<String, Vec<StepResult>>,
  linked: HashMap<String, Vec<LinkedExecution>>,
}

impl ExecutionCache {
  pub fn step_results(&self, execution_id: &str) -> Option<&[StepResult]> {
    self.step_results.get(execution_id).map(Vec::as_slice)
  }

  pub fn insert_step_results(&mut self, execution_id: &str, results: Vec<StepResult>) {
    self.step_results.insert(execution_id.to_string(), results);
  }

  pub fn linked(&self, execution_id: &str) -> Option<&[LinkedExecution]> {
    self.linked.get(execution_id).map(Vec::as_slice)
  }

  pub fn insert_linked(&mut self, execution_id: &str, linked: Vec<LinkedExecution>) {
    self.linked.insert(execution_id.to_string(), linked);
  }

  pub fn clear(&mut self) {
    self.step_results.clear();
    self.linked.clear();
  }
}
