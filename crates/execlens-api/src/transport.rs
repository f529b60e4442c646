//! GraphQL transport.

use async_trait::async_trait;
use execlens_config::ApiConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::ApiError;

/// Sends one GraphQL document and returns its `data` payload.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
  async fn execute(&self, query: &str, variables: Value) -> Result<Value, ApiError>;
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
  data: Option<Value>,
  #[serde(default)]
  errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
  message: String,
}

/// HTTP transport with bearer authentication.
pub struct HttpTransport {
  client: Client,
  endpoint: Url,
  api_token: Option<String>,
}

impl HttpTransport {
  pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
    let endpoint = Url::parse(&config.endpoint).map_err(|e| ApiError::InvalidEndpoint {
      endpoint: config.endpoint.clone(),
      message: e.to_string(),
    })?;

    let mut builder = Client::builder();
    if let Some(timeout) = config.timeout() {
      builder = builder.timeout(timeout);
    }

    Ok(Self {
      client: builder.build()?,
      endpoint,
      api_token: config.api_token.clone(),
    })
  }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
  async fn execute(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
    let token = self
      .api_token
      .as_deref()
      .filter(|t| !t.is_empty())
      .ok_or(ApiError::MissingCredential)?;

    let response = self
      .client
      .post(self.endpoint.clone())
      .bearer_auth(token)
      .json(&json!({ "query": query, "variables": variables }))
      .send()
      .await?;

    let status = response.status();
    debug!(status = status.as_u16(), "graphql response received");

    if status == StatusCode::UNAUTHORIZED {
      let body = response.text().await.unwrap_or_default();
      return Err(ApiError::Unauthorized {
        message: if body.is_empty() {
          "credential rejected".to_string()
        } else {
          body
        },
      });
    }

    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(ApiError::Http {
        status: status.as_u16(),
        body,
      });
    }

    let body: GraphqlResponse = response.json().await?;
    unwrap_response(body)
  }
}

fn unwrap_response(body: GraphqlResponse) -> Result<Value, ApiError> {
  if let Some(first) = body.errors.into_iter().next() {
    return Err(ApiError::Graphql {
      message: first.message,
    });
  }

  body.data.ok_or_else(|| ApiError::Decode {
    message: "response has neither data nor errors".to_string(),
  })
}
