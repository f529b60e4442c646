//! Execlens Render
//!
//! Turns fetched execution data into view state without re-rendering what is
//! already on screen.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ResultsRenderer<T>                       │
//! │  - render_logs_incremental: appends only unseen logs        │
//! │  - update_step_navigation_*: rebuilds the index wholesale   │
//! │  - render_linked_executions, show_error, clear              │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   T: RenderTarget                           │
//! │  - ViewState: in-memory view model                          │
//! │  - ChannelTarget: forwards RenderEvents to a UI process     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The navigation index is recomputed from the full log set on every call.
//! Nested loop grouping cannot be patched efficiently from a single batch, and
//! the rebuild only touches in-memory data that was already fetched.

mod fragments;
mod navigation;
mod renderer;
mod target;
mod view;

pub use fragments::{FragmentGroup, detect_fragment_groups};
pub use navigation::{LoopEntry, LoopKey, StepDecoration, StepEntry, StepNavigationIndex, merge_step_status};
pub use renderer::ResultsRenderer;
pub use target::{ChannelTarget, ErrorBanner, ErrorKind, RenderEvent, RenderTarget};
pub use view::ViewState;
