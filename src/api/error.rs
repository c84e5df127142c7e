//! Error taxonomy for calls against the admin REST backend.

/// Result alias used by the API client and the cache layer.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors produced while talking to the backend.
///
/// Errors are cloneable so a single failed fetch can be handed to every
/// caller that joined it, and stored verbatim in the failed cache entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
  /// The request never reached the server (DNS, connect, TLS, reset).
  #[error("network error: {0}")]
  Network(String),

  /// The server answered with a non-success status.
  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },

  /// A required key was missing; no request was made.
  #[error("{0}")]
  Validation(String),

  /// The response body did not have the expected shape.
  #[error("failed to decode response: {0}")]
  Decode(String),
}

impl ApiError {
  /// Build the "<resource> id is required" validation error.
  pub fn missing_id(resource: &str) -> Self {
    ApiError::Validation(format!("{} id is required", resource))
  }

  /// HTTP status code, if the server answered.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub fn is_not_found(&self) -> bool {
    self.status() == Some(404)
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      return ApiError::Decode(e.to_string());
    }
    match e.status() {
      Some(status) => ApiError::Http {
        status: status.as_u16(),
        message: e.to_string(),
      },
      None => ApiError::Network(e.to_string()),
    }
  }
}

/// Reject a missing or blank id before any network call is attempted.
pub fn require_id<'a>(resource: &str, id: Option<&'a str>) -> ApiResult<&'a str> {
  match id {
    Some(id) if !id.trim().is_empty() => Ok(id),
    _ => Err(ApiError::missing_id(resource)),
  }
}
