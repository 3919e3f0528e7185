//! Error types for the CouchDB client SDK.

use std::fmt;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("Invalid server URL: {0}")]
  InvalidUrl(String),

  #[error("Transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("{0}")]
  Request(#[from] RequestError),

  #[error("Malformed response: {0}")]
  Protocol(String),

  #[error("Invalid request: {0}")]
  Validation(String),

  #[error("Serialization error: {0}")]
  Serialization(String),

  /// Login succeeded and set a session cookie, but the rest of the response
  /// could not be read. The token is still valid server-side.
  #[error("Session created but response unreadable: {message}")]
  Session { message: String, token: String },

  /// The server accepted the request but the body did not decode. Any id or
  /// revision already observed on the response is kept.
  #[error("Decode error: {message} (id={id:?}, rev={rev:?})")]
  Decode {
    message: String,
    id: Option<String>,
    rev: Option<String>,
  },
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

impl Error {
  /// Returns the server error when this is a `Request` error.
  pub fn as_request_error(&self) -> Option<&RequestError> {
    match self {
      Error::Request(e) => Some(e),
      _ => None,
    }
  }

  /// True for a 409 document update conflict.
  pub fn is_conflict(&self) -> bool {
    self.as_request_error().is_some_and(RequestError::is_conflict)
  }

  /// True for a 404.
  pub fn is_not_found(&self) -> bool {
    self.as_request_error().is_some_and(RequestError::is_not_found)
  }
}

/// The server answered with a status of 400 or above.
///
/// `error` and `reason` come from the `{"error": .., "reason": ..}` body and
/// are empty for HEAD requests, which carry no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
  pub status: StatusCode,
  pub method: Method,
  pub url: String,
  pub error: String,
  pub reason: String,
}

impl RequestError {
  pub fn status_code(&self) -> u16 {
    self.status.as_u16()
  }

  pub fn is_conflict(&self) -> bool {
    self.status == StatusCode::CONFLICT
  }

  pub fn is_not_found(&self) -> bool {
    self.status == StatusCode::NOT_FOUND
  }

  pub fn is_unauthorized(&self) -> bool {
    self.status == StatusCode::UNAUTHORIZED
  }

  pub fn is_forbidden(&self) -> bool {
    self.status == StatusCode::FORBIDDEN
  }

  pub fn is_precondition_failed(&self) -> bool {
    self.status == StatusCode::PRECONDITION_FAILED
  }
}

impl fmt::Display for RequestError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} {}: {} {} {}",
      self.method,
      self.url,
      self.status.as_u16(),
      self.error,
      self.reason
    )
  }
}

impl std::error::Error for RequestError {}

/// Error payload CouchDB sends alongside 4xx/5xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouchError {
  #[serde(default)]
  pub error: String,
  #[serde(default)]
  pub reason: String,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  fn request_error(status: StatusCode) -> RequestError {
    RequestError {
      status,
      method: Method::PUT,
      url: "http://localhost:5984/orders/o1".to_string(),
      error: "conflict".to_string(),
      reason: "Document update conflict.".to_string(),
    }
  }

  #[test]
  fn test_request_error_display() {
    let err = request_error(StatusCode::CONFLICT);
    assert_eq!(
      err.to_string(),
      "PUT http://localhost:5984/orders/o1: 409 conflict Document update conflict."
    );
  }

  #[test]
  fn test_status_classification() {
    assert!(request_error(StatusCode::CONFLICT).is_conflict());
    assert!(request_error(StatusCode::NOT_FOUND).is_not_found());
    assert!(request_error(StatusCode::UNAUTHORIZED).is_unauthorized());
    assert!(request_error(StatusCode::FORBIDDEN).is_forbidden());
    assert!(request_error(StatusCode::PRECONDITION_FAILED).is_precondition_failed());
    assert!(!request_error(StatusCode::CONFLICT).is_not_found());
  }

  #[test]
  fn test_error_helpers_only_match_request_errors() {
    let err: Error = request_error(StatusCode::CONFLICT).into();
    assert!(err.is_conflict());
    assert_eq!(err.as_request_error().map(|e| e.status_code()), Some(409));

    let err = Error::Protocol("no revision".to_string());
    assert!(!err.is_conflict());
    assert!(!err.is_not_found());
    assert!(err.as_request_error().is_none());
  }

  #[test]
  fn test_couch_error_tolerates_missing_fields() {
    let parsed: CouchError = serde_json::from_str(r#"{"error":"not_found"}"#).unwrap();
    assert_eq!(parsed.error, "not_found");
    assert_eq!(parsed.reason, "");
  }
}
