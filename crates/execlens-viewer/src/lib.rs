//! Execlens Viewer
//!
//! Orchestrates one execution-detail load: metadata first, then the log
//! stream, the step-result stream and the linked-execution lookup side by
//! side, then one combined render pass.
//!
//! # Architecture
//!
//! ```text
//! FetchOrchestrator
//! ├── set_execution_id(id)
//! ├── fetch_results() -> FetchCycle::run()
//! │   ├── MetadataLoading         execution(id)
//! │   ├── StreamingLogsAndSteps   join!(logs, step results, linked executions)
//! │   └── Finalizing              navigation + step status, linked panel, fragments
//! ├── watch(interval, cancel)     reload while the execution is running
//! └── replay()                    replay, then load the new execution
//! ```
//!
//! # Cancellation
//!
//! Every `fetch_results` call takes a new generation number. A cycle checks
//! its generation before each render mutation and before pulling another page;
//! once a newer cycle has started, the older one stops without touching the
//! view. In-flight requests are not aborted, their results are discarded.
//!
//! # Usage
//!
//! ```ignore
//! use execlens_viewer::FetchOrchestrator;
//!
//! let viewer = FetchOrchestrator::with_defaults(Arc::new(client), ViewState::new());
//! viewer.set_execution_id("SW5zdGFuY2VFeGVjdXRpb246MQ==");
//! let outcome = viewer.fetch_results().await?;
//! ```

mod cache;
mod cycle;
mod error;
mod orchestrator;
mod watch;

pub use cycle::{CycleSummary, FetchOutcome};
pub use error::FetchError;
pub use orchestrator::{FetchOrchestrator, FetchPhase};
pub use watch::WatchExit;
