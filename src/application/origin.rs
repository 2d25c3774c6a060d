//! Boundary to the upstream font service.

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use thiserror::Error;

/// A complete upstream response. Any status is possible; interpreting it is
/// the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl OriginResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport-level failure: no usable status or body was received.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid upstream URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("upstream request to `{url}` timed out")]
    Timeout { url: String },
    #[error("upstream request to `{url}` failed: {message}")]
    Transport { url: String, message: String },
}

/// Performs outbound GET requests against the origin.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<OriginResponse, FetchError>;
}
