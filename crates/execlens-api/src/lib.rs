//! Execlens API
//!
//! Everything the viewer needs to talk to the platform's single GraphQL
//! endpoint.
//!
//! # Architecture
//!
//! ```text
//! ExecutionApi (trait)              typed queries the viewer depends on
//! └── PlatformClient<T>
//!     ├── RateGate                  spaces every outbound request
//!     └── T: GraphqlTransport       execute(query, variables) -> data
//!         └── HttpTransport         bearer auth, 401 / HTTP / GraphQL errors
//! ```
//!
//! The transport is opaque to the rest of the workspace: tests substitute
//! their own `GraphqlTransport` or `ExecutionApi` implementations.

mod client;
mod error;
mod gate;
pub mod queries;
mod transport;

pub use client::{ExecutionApi, PlatformClient, StepResultFilter};
pub use error::ApiError;
pub use gate::RateGate;
pub use transport::{GraphqlTransport, HttpTransport};
