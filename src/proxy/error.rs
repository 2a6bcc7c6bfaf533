use crate::error::{UpstreamError, UpstreamErrorKind};
use crate::models::ErrorBody;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Every way a proxy request can fail, each with a fixed HTTP mapping.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("API key is not configured. Check the server environment variables.")]
    Configuration,

    #[error("{0}")]
    Validation(String),

    #[error("Failed to parse request body: {0}")]
    Parse(#[from] serde_json::Error),

    /// The body could not be buffered, e.g. it exceeds the configured limit.
    #[error("Failed to read request body: {0}")]
    Body(#[from] BytesRejection),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::Configuration | ProxyError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Body(rejection) => rejection.status(),
            ProxyError::Upstream(err) => match err.kind {
                // Rate limiting that outlived every retry is reported as a server failure.
                UpstreamErrorKind::RateLimited
                | UpstreamErrorKind::Transport
                | UpstreamErrorKind::EmptyContent => StatusCode::INTERNAL_SERVER_ERROR,
                UpstreamErrorKind::Status(code) => {
                    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                }
                UpstreamErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                UpstreamErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            },
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ProxyError::MethodNotAllowed
            | ProxyError::Configuration
            | ProxyError::Validation(_) => ErrorBody {
                message: self.to_string(),
                error: None,
            },
            ProxyError::Parse(err) => ErrorBody {
                message: "Internal server error while processing the request".to_string(),
                error: Some(err.to_string()),
            },
            ProxyError::Body(rejection) => ErrorBody {
                message: "Failed to read request body".to_string(),
                error: Some(rejection.body_text()),
            },
            ProxyError::Upstream(err) => ErrorBody {
                message: match err.kind {
                    UpstreamErrorKind::EmptyContent => "Upstream returned an empty response",
                    UpstreamErrorKind::Cancelled => "Server is shutting down",
                    UpstreamErrorKind::DeadlineExceeded => "Upstream request timed out",
                    _ => "Failed to communicate with the generative API",
                }
                .to_string(),
                error: Some(err.message.clone()),
            },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ProxyError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ProxyError::Configuration.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::Validation("x".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::from(UpstreamError::from_status(429, "quota")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::from(UpstreamError::from_status(400, "bad")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::from(UpstreamError::new(UpstreamErrorKind::DeadlineExceeded, "late"))
                .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ProxyError::from(UpstreamError::new(UpstreamErrorKind::Cancelled, "stopped"))
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_cancelled_body_reports_shutdown() {
        let body = ProxyError::from(UpstreamError::new(
            UpstreamErrorKind::Cancelled,
            "Upstream call was cancelled",
        ))
        .body();
        assert_eq!(body.message, "Server is shutting down");
        assert_eq!(body.error.as_deref(), Some("Upstream call was cancelled"));
    }

    #[test]
    fn test_upstream_body_carries_last_message() {
        let body = ProxyError::from(UpstreamError::transport("connection reset")).body();
        assert_eq!(body.error.as_deref(), Some("connection reset"));
        assert!(!body.message.is_empty());
    }

    #[test]
    fn test_parse_body_has_message_and_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let body = ProxyError::from(err).body();
        assert!(!body.message.is_empty());
        assert!(body.error.is_some());
    }

    #[test]
    fn test_method_not_allowed_body() {
        let body = ProxyError::MethodNotAllowed.body();
        assert_eq!(body.message, "Method Not Allowed");
        assert!(body.error.is_none());
    }
}
