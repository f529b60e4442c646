//! Fetch orchestrator.
//!
//! Owns the session state shared by every fetch cycle: the requested and
//! loaded execution ids, the generation counter, per-execution caches and the
//! renderer. All of it sits behind one mutex that is never held across an
//! await point, so a cycle's staleness check and its render mutation happen
//! atomically with respect to a newer cycle starting.

use std::sync::{Arc, Mutex, MutexGuard};

use execlens_api::ExecutionApi;
use execlens_config::{StreamConfig, ViewerConfig};
use execlens_model::{ExecutionMetadata, ReplayOutcome};
use execlens_render::{RenderTarget, ResultsRenderer};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cache::ExecutionCache;
use crate::cycle::{FetchCycle, FetchOutcome};
use crate::error::FetchError;

/// Where the most recent fetch cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
  Idle,
  MetadataLoading,
  StreamingLogsAndSteps,
  Finalizing,
  Done,
  /// The execution does not exist.
  Aborted,
  /// Metadata or logs could not be loaded.
  Failed,
}

pub(crate) struct Session<T: RenderTarget> {
  pub generation: u64,
  pub requested_id: Option<String>,
  pub loaded_id: Option<String>,
  phase: watch::Sender<FetchPhase>,
  pub execution: Option<ExecutionMetadata>,
  pub cache: ExecutionCache,
  pub renderer: ResultsRenderer<T>,
}

impl<T: RenderTarget> Session<T> {
  pub fn phase(&self) -> FetchPhase {
    *self.phase.borrow()
  }

  pub fn set_phase(&mut self, phase: FetchPhase) {
    self.phase.send_replace(phase);
  }
}

/// Loads executions into a [`RenderTarget`], one generation at a time.
pub struct FetchOrchestrator<A, T: RenderTarget> {
  pub(crate) api: Arc<A>,
  pub(crate) streams: StreamConfig,
  pub(crate) viewer: ViewerConfig,
  session: Mutex<Session<T>>,
}

impl<A, T> FetchOrchestrator<A, T>
where
  A: ExecutionApi + 'static,
  T: RenderTarget,
{
  pub fn new(api: Arc<A>, target: T, streams: StreamConfig, viewer: ViewerConfig) -> Self {
    let (phase, _) = watch::channel(FetchPhase::Idle);
    Self {
      api,
      streams,
      viewer,
      session: Mutex::new(Session {
        generation: 0,
        requested_id: None,
        loaded_id: None,
        phase,
        execution: None,
        cache: ExecutionCache::default(),
        renderer: ResultsRenderer::new(target),
      }),
    }
  }

  pub fn with_defaults(api: Arc<A>, target: T) -> Self {
    Self::new(api, target, StreamConfig::default(), ViewerConfig::default())
  }

  /// Select the execution the next `fetch_results` call loads.
  pub fn set_execution_id(&self, execution_id: impl Into<String>) {
    let execution_id = execution_id.into();
    debug!(execution_id = %execution_id, "execution selected");
    self.lock().requested_id = Some(execution_id);
  }

  pub fn execution_id(&self) -> Option<String> {
    self.lock().requested_id.clone()
  }

  pub fn phase(&self) -> FetchPhase {
    self.lock().phase()
  }

  /// Follow phase changes. Every transition is published before the render
  /// calls of that phase run, so a render target holding the receiver sees
  /// the phase its calls belong to.
  pub fn phases(&self) -> watch::Receiver<FetchPhase> {
    self.lock().phase.subscribe()
  }

  /// Generation of the most recently started cycle.
  pub fn generation(&self) -> u64 {
    self.lock().generation
  }

  /// Metadata of the execution currently on screen.
  pub fn loaded_execution(&self) -> Option<ExecutionMetadata> {
    self.lock().execution.clone()
  }

  /// Inspect the render target.
  pub fn view<R>(&self, f: impl FnOnce(&T) -> R) -> R {
    f(self.lock().renderer.target())
  }

  /// Run `f` against the render target, e.g. to flush output a target buffers.
  pub fn with_target<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
    f(self.lock().renderer.target_mut())
  }

  /// Output URL of a step, taken from the step results of the loaded execution.
  ///
  /// `loop_step_index` selects one iteration of a loop step. When a step ran
  /// more than once, the latest result with an output wins.
  pub fn step_output_url(&self, step_name: &str, loop_step_index: Option<u32>) -> Option<String> {
    let session = self.lock();
    let loaded = session.loaded_id.as_deref()?;
    session
      .cache
      .step_results(loaded)?
      .iter()
      .filter(|r| r.step_name == step_name && r.loop_step_index == loop_step_index)
      .filter(|r| r.results_url.is_some())
      .max_by_key(|r| r.started_at)
      .and_then(|r| r.results_url.clone())
  }

  /// Load the selected execution.
  ///
  /// Starting a cycle supersedes any cycle still running; the older one stops
  /// at its next checkpoint and returns [`FetchOutcome::Superseded`].
  pub async fn fetch_results(&self) -> Result<FetchOutcome, FetchError> {
    let (generation, execution_id) = self.begin_cycle()?;
    FetchCycle::new(self, generation, execution_id).run().await
  }

  /// Select `execution_id` and load it.
  pub async fn load(&self, execution_id: impl Into<String>) -> Result<FetchOutcome, FetchError> {
    self.set_execution_id(execution_id);
    self.fetch_results().await
  }

  /// Replay the selected execution, then load the execution the replay started.
  pub async fn replay(&self) -> Result<FetchOutcome, FetchError> {
    let execution_id = self.execution_id().ok_or(FetchError::NoExecutionId)?;
    let outcome = self
      .api
      .replay_execution(&execution_id)
      .await
      .map_err(FetchError::Replay)?;

    match outcome {
      ReplayOutcome::Started {
        execution_id: replayed,
      } => {
        info!(source = %execution_id, execution_id = %replayed, "execution replayed");
        self.load(replayed).await
      }
      ReplayOutcome::Rejected { errors } => Err(FetchError::ReplayRejected { errors }),
    }
  }

  /// Take the next generation and reset per-execution state when the
  /// selected execution changed.
  fn begin_cycle(&self) -> Result<(u64, String), FetchError> {
    let mut session = self.lock();
    let execution_id = session
      .requested_id
      .clone()
      .ok_or(FetchError::NoExecutionId)?;

    session.generation += 1;
    if session.loaded_id.as_deref() != Some(execution_id.as_str()) {
      debug!(
        previous = ?session.loaded_id,
        execution_id = %execution_id,
        "execution changed, clearing caches"
      );
      session.cache.clear();
      session.loaded_id = Some(execution_id.clone());
    }
    session.execution = None;
    session.set_phase(FetchPhase::MetadataLoading);

    Ok((session.generation, execution_id))
  }

  pub(crate) fn lock(&self) -> MutexGuard<'_, Session<T>> {
    // A panic inside a render call leaves nothing half-updated that a later
    // cycle cannot overwrite.
    self.session.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub(crate) fn is_current(&self, generation: u64) -> bool {
    self.lock().generation == generation
  }

  /// Apply `f` only if `generation` is still the newest cycle.
  pub(crate) fn commit(&self, generation: u64, f: impl FnOnce(&mut Session<T>)) -> bool {
    let mut session = self.lock();
    if session.generation != generation {
      debug!(generation, current = session.generation, "discarding stale update");
      return false;
    }
    f(&mut session);
    true
  }
}
