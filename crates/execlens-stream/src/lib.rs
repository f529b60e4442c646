//! Execlens Stream
//!
//! Paginated collections exposed as lazy streams of accumulated snapshots.
//!
//! [`paginate`] is the generic primitive: it follows the server's cursor one
//! page at a time, only when the consumer polls, and yields the full list
//! accumulated so far after every page. It is finite and cannot be restarted.
//! Dropping the stream is the only way to stop it early.
//!
//! Two instantiations sit on top of it:
//! - [`log_stream`]: execution logs, newest first, with the first page's
//!   total count held for the whole stream
//! - [`step_result_stream`]: step results, oldest first, with optional filters
//!
//! # Usage
//!
//! ```ignore
//! use futures::TryStreamExt;
//!
//! let mut logs = std::pin::pin!(log_stream(api, "exec-1", LogStreamOptions::default()));
//! while let Some(snapshot) = logs.try_next().await? {
//!     render(snapshot.new_logs(), snapshot.page_start);
//! }
//! ```

mod logs;
mod paginate;
mod steps;

pub use logs::{LogSnapshot, LogSource, LogStreamOptions, log_stream};
pub use paginate::{PageSource, Snapshot, paginate};
pub use steps::{StepResultSource, StepSnapshot, StepStreamOptions, step_result_stream};
