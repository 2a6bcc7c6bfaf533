//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a single failed upstream attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// Connection, timeout, or undecodable response body.
    Transport,
    /// HTTP 429.
    RateLimited,
    /// Any other non-2xx status.
    Status(u16),
    /// 2xx response without the expected artifact.
    EmptyContent,
    /// The retry sequence was aborted through its cancellation token.
    Cancelled,
    /// The request-scoped deadline elapsed.
    DeadlineExceeded,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
}

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::Transport, message)
    }

    pub fn empty_content(message: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::EmptyContent, message)
    }

    /// Builds the failure for a non-2xx response.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = if status == 429 {
            UpstreamErrorKind::RateLimited
        } else {
            UpstreamErrorKind::Status(status)
        };
        Self::new(kind, message)
    }

    /// HTTP status carried by the failure, if the upstream reported one.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            UpstreamErrorKind::RateLimited => Some(429),
            UpstreamErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}
