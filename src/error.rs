use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced by the internal HTTP routes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Internal Error: {0}")]
    Internal(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Store(err) => {
                tracing::error!("Store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// Failures of the persistence adapters (Postgres, Redis, in-memory).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Failure of one delivery workflow step.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    /// Malformed or missing integration configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// No stored account, missing refresh token, or refresh rejected.
    #[error("credential error: {0}")]
    Credential(String),
    /// Network failure, 5xx, 429 or similar; worth another attempt.
    #[error("transient delivery error: {0}")]
    Transient(String),
    /// The destination refused the request outright.
    #[error("destination rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("step timed out after {0:?}")]
    Timeout(Duration),
    #[error("store error: {0}")]
    Store(String),
}

impl DeliveryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Transient(_) | DeliveryError::Store(_))
    }

    /// Classify a non-2xx HTTP response from a destination.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status.is_server_error()
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
        {
            DeliveryError::Transient(format!("destination returned {status}: {body}"))
        } else if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            DeliveryError::Credential(format!("destination returned {status}: {body}"))
        } else {
            DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }
}

impl From<StoreError> for DeliveryError {
    fn from(err: StoreError) -> Self {
        DeliveryError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Transient(format!("request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn status_classification() {
        assert!(DeliveryError::from_status(StatusCode::BAD_GATEWAY, String::new()).is_retryable());
        assert!(
            DeliveryError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable()
        );
        assert!(matches!(
            DeliveryError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            DeliveryError::Credential(_)
        ));
        assert!(matches!(
            DeliveryError::from_status(StatusCode::BAD_REQUEST, "nope".into()),
            DeliveryError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn only_transient_and_store_errors_retry() {
        assert!(DeliveryError::Store("down".into()).is_retryable());
        assert!(!DeliveryError::Configuration("bad".into()).is_retryable());
        assert!(!DeliveryError::Credential("none".into()).is_retryable());
        assert!(!DeliveryError::Timeout(Duration::from_secs(1)).is_retryable());
    }
}
