//! Error types for fetch cycles.

use execlens_api::ApiError;
use execlens_render::{ErrorBanner, ErrorKind};
use thiserror::Error;

/// Errors that end a fetch cycle.
#[derive(Debug, Error)]
pub enum FetchError {
  /// `fetch_results` was called before any execution id was set.
  #[error("no execution selected")]
  NoExecutionId,

  /// The metadata query returned nothing for this id.
  #[error("execution '{execution_id}' not found")]
  NotFound { execution_id: String },

  /// The metadata query failed.
  #[error("failed to load execution: {0}")]
  Metadata(#[source] ApiError),

  /// The log stream failed. Logs rendered before the failure stay visible.
  #[error("failed to load logs: {0}")]
  Logs(#[source] ApiError),

  /// The replay mutation could not be sent.
  #[error("failed to replay execution: {0}")]
  Replay(#[source] ApiError),

  /// The replay mutation returned field-level errors.
  #[error("replay rejected: {}", errors.join("; "))]
  ReplayRejected { errors: Vec<String> },
}

impl FetchError {
  /// Whether the user needs to set up or refresh their credential.
  pub fn is_auth(&self) -> bool {
    self.api_error().is_some_and(ApiError::is_auth)
  }

  pub fn api_error(&self) -> Option<&ApiError> {
    match self {
      FetchError::Metadata(e) | FetchError::Logs(e) | FetchError::Replay(e) => Some(e),
      _ => None,
    }
  }

  /// Text shown to the user.
  pub fn user_message(&self) -> String {
    match self {
      FetchError::NotFound { .. } => "Execution not found".to_string(),
      FetchError::NoExecutionId => "Select an execution to view".to_string(),
      other => other.to_string(),
    }
  }

  pub fn banner(&self) -> ErrorBanner {
    let kind = match self {
      FetchError::NotFound { .. } => ErrorKind::NotFound,
      FetchError::NoExecutionId | FetchError::ReplayRejected { .. } => ErrorKind::Other,
      FetchError::Metadata(e) | FetchError::Logs(e) | FetchError::Replay(e) => match e {
        ApiError::MissingCredential | ApiError::Unauthorized { .. } => ErrorKind::Authentication,
        ApiError::Http { .. } | ApiError::Request(_) => ErrorKind::Transport,
        ApiError::Graphql { .. } | ApiError::Decode { .. } => ErrorKind::Api,
        ApiError::InvalidEndpoint { .. } => ErrorKind::Other,
      },
    };
    ErrorBanner::new(kind, self.user_message())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_not_found_message() {
    let err = FetchError::NotFound {
      execution_id: "missing-123".to_string(),
    };
    let banner = err.banner();
    assert_eq!(banner.kind, ErrorKind::NotFound);
    assert_eq!(banner.message, "Execution not found");
    assert!(!err.is_auth());
  }

  #[test]
  fn test_auth_errors_are_flagged() {
    let err = FetchError::Metadata(ApiError::Unauthorized {
      message: "expired".to_string(),
    });
    assert!(err.is_auth());
    assert_eq!(err.banner().kind, ErrorKind::Authentication);

    let err = FetchError::Logs(ApiError::MissingCredential);
    assert!(err.is_auth());
  }

  #[test]
  fn test_error_categories() {
    let http = FetchError::Logs(ApiError::Http {
      status: 500,
      body: String::new(),
    });
    assert_eq!(http.banner().kind, ErrorKind::Transport);
    assert!(http.banner().message.contains("500"));

    let api = FetchError::Metadata(ApiError::Graphql {
      message: "Not allowed".to_string(),
    });
    assert_eq!(api.banner().kind, ErrorKind::Api);
    assert!(api.user_message().contains("Not allowed"));
  }

  #[test]
  fn test_replay_rejection_lists_errors() {
    let err = FetchError::ReplayRejected {
      errors: vec!["id: still running".to_string(), "other".to_string()],
    };
    assert_eq!(err.to_string(), "replay rejected: id: still running; other");
  }
}
