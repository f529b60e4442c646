//! Request spacing.
//!
//! Every outbound request waits on one shared [`RateGate`] so the platform
//! sees at most one request per `min_delay`, however many streams are
//! fetching at once.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Serializes callers and spaces their return times by at least `min_delay`.
///
/// The lock is held across the sleep: a caller that arrives while another is
/// waiting queues behind it and measures its own delay from the moment the
/// earlier caller was released.
#[derive(Debug)]
pub struct RateGate {
  min_delay: Duration,
  last_release: Mutex<Option<Instant>>,
}

impl RateGate {
  pub fn new(min_delay: Duration) -> Self {
    Self {
      min_delay,
      last_release: Mutex::new(None),
    }
  }

  /// Return once it is safe to issue the next request.
  pub async fn wait(&self) {
    let mut last_release = self.last_release.lock().await;

    if let Some(previous) = *last_release {
      let elapsed = previous.elapsed();
      if elapsed < self.min_delay {
        tokio::time::sleep(self.min_delay - elapsed).await;
      }
    }

    *last_release = Some(Instant::now());
  }
}

impl Default for RateGate {
  fn default() -> Self {
    Self::new(Duration::from_millis(250))
  }
}
