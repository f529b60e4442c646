//! Execlens Model
//!
//! The records the dashboard reads from the platform's GraphQL API:
//! - [`ExecutionMetadata`] identifies one execution run
//! - [`LogEntry`] is one log line of that run
//! - [`StepResult`] is one step's execution record (one per loop iteration)
//! - [`LinkedExecution`] is a member of an "invoked by" chain
//!
//! Field names follow the API's camelCase so the types deserialize directly
//! from query payloads.

mod execution;
mod log;
mod page;
mod step;

pub use execution::{
  ExecutionLineage, ExecutionMetadata, ExecutionRef, ExecutionStatus, FlowRef, InstanceRef,
  InvokedBy, LinkedExecution, ReplayOutcome,
};
pub use log::LogEntry;
pub use page::Page;
pub use step::{StepResult, StepStatus};
