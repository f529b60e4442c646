//! Error types for API access.

use thiserror::Error;

/// Errors surfaced by the GraphQL transport and typed queries.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No credential is configured; the request was never sent.
  #[error("no API token configured")]
  MissingCredential,

  /// The server rejected the credential (HTTP 401).
  #[error("authentication failed: {message}")]
  Unauthorized { message: String },

  /// Any other non-2xx response.
  #[error("HTTP error {status}: {body}")]
  Http { status: u16, body: String },

  /// The response carried a GraphQL `errors` array. Only the first message is kept.
  #[error("API error: {message}")]
  Graphql { message: String },

  /// The request could not be sent or the body could not be read.
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),

  /// The payload did not have the expected shape.
  #[error("unexpected response: {message}")]
  Decode { message: String },

  /// The endpoint URL is not usable.
  #[error("invalid endpoint '{endpoint}': {message}")]
  InvalidEndpoint { endpoint: String, message: String },
}

impl ApiError {
  /// Whether the user needs to (re)configure their credential.
  pub fn is_auth(&self) -> bool {
    matches!(
      self,
      ApiError::MissingCredential | ApiError::Unauthorized { .. }
    )
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(e: serde_json::Error) -> Self {
    ApiError::Decode {
      message: e.to_string(),
    }
  }
}
