use std::error::Error as StdError;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use thiserror::Error;

use crate::{application::fonts::ProxyError, config::LoadError, infra::error::InfraError};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Page returned when `/css` is requested without a usable `family` value.
pub const MISSING_FAMILY_PAGE: &str = r#"<!DOCTYPE html>
<html lang=en>
  <meta charset=utf-8>
  <meta name=viewport content="initial-scale=1, minimum-scale=1, width=device-width">
  <title>Error 400 (Font family not found)!!1</title>
  <p><b>400.</b> <ins>That's an error.</ins>
  <p>Missing font family. <ins>The requested font families are not available.</ins>
</html>
"#;

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// A client-facing error body plus the report the access log consumes.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: Bytes::from_static(public_message.as_bytes()),
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: Bytes::from_static(public_message.as_bytes()),
            report: ErrorReport::from_error(source, status, error),
        }
    }

    fn with_body(mut self, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        self.content_type = content_type;
        self.body = body.into();
        self
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<ProxyError> for HttpError {
    fn from(error: ProxyError) -> Self {
        const SOURCE: &str = "infra::http::proxy_error_to_http_error";

        match error {
            ProxyError::MissingFamily => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Missing font family",
                "Request carried no usable `family` parameter",
            )
            .with_body(TEXT_HTML, MISSING_FAMILY_PAGE),
            ProxyError::InvalidAssetPath { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid font asset path",
                &error,
            ),
            ProxyError::UpstreamUnreachable(ref inner) => {
                let body = format!("Request source error: {inner}");
                HttpError::from_error(SOURCE, StatusCode::BAD_GATEWAY, "", &error)
                    .with_body(TEXT_PLAIN, body)
            }
            ProxyError::UpstreamStatus { status, ref body } => {
                let body = body.clone();
                HttpError::from_error(SOURCE, status, "", &error).with_body(TEXT_HTML, body)
            }
            ProxyError::Storage(_) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &error,
            ),
        }
    }
}

/// Failures that abort the process before or while serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
