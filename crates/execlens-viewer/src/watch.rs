//! Follow a running execution.

use std::time::Duration;

use execlens_api::ExecutionApi;
use execlens_model::ExecutionStatus;
use execlens_render::RenderTarget;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cycle::FetchOutcome;
use crate::error::FetchError;
use crate::orchestrator::FetchOrchestrator;

/// Why a [`FetchOrchestrator::watch`] loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
  /// The execution reached a terminal status.
  Finished { status: ExecutionStatus, cycles: usize },
  Cancelled { cycles: usize },
  /// Another fetch took over the view.
  Superseded { cycles: usize },
}

impl<A, T> FetchOrchestrator<A, T>
where
  A: ExecutionApi + 'static,
  T: RenderTarget,
{
  /// Reload the selected execution every `interval` while it is running or
  /// pending.
  ///
  /// The first load happens immediately. Fetch errors end the loop.
  pub async fn watch(
    &self,
    interval: Duration,
    cancel: CancellationToken,
  ) -> Result<WatchExit, FetchError> {
    let mut cycles = 0;

    loop {
      if cancel.is_cancelled() {
        return Ok(WatchExit::Cancelled { cycles });
      }

      let outcome = self.fetch_results().await?;
      cycles += 1;

      let summary = match outcome {
        FetchOutcome::Completed(summary) => summary,
        FetchOutcome::Superseded { .. } => return Ok(WatchExit::Superseded { cycles }),
      };

      let status = summary.execution.status;
      if !status.is_active() {
        info!(
          execution_id = %summary.execution.id,
          status = %status,
          cycles,
          "execution finished"
        );
        return Ok(WatchExit::Finished { status, cycles });
      }

      tokio::select! {
        _ = cancel.cancelled() => {
          info!(execution_id = %summary.execution.id, cycles, "watch cancelled");
          return Ok(WatchExit::Cancelled { cycles });
        }
        _ = tokio::time::sleep(interval) => {}
      }
    }
  }

  /// [`watch`](Self::watch) with the configured poll interval.
  pub async fn follow(&self, cancel: CancellationToken) -> Result<WatchExit, FetchError> {
    self.watch(self.viewer.poll_interval(), cancel).await
  }
}
