use std::sync::Arc;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{
        HeaderMap, HeaderValue, StatusCode, Uri,
        header::{
            ACCEPT_RANGES, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_LENGTH,
            CONTENT_TYPE, SERVER, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    response::{IntoResponse, Response},
};
use tracing::warn;
use url::form_urlencoded;

use crate::application::{
    error::HttpError,
    fonts::{FontPayload, FontProxyService},
};

pub const SERVER_NAME: &str = concat!("fontproxy/", env!("CARGO_PKG_VERSION"));

const PAYLOAD_SOURCE_HEADER: &str = "x-fontproxy-source";

#[derive(Clone)]
pub struct FontsState {
    pub service: Arc<FontProxyService>,
}

pub async fn stylesheet(State(state): State<FontsState>, RawQuery(query): RawQuery) -> Response {
    let family = query.as_deref().and_then(family_param);

    match state.service.stylesheet(family.as_deref()).await {
        Ok(payload) => {
            let mut response = payload_response(payload);
            let headers = response.headers_mut();
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
            response
        }
        Err(err) => error_response(HttpError::from(err)),
    }
}

pub async fn asset(State(state): State<FontsState>, uri: Uri) -> Response {
    match state.service.asset(uri.path()).await {
        Ok(payload) => {
            let mut response = payload_response(payload);
            let headers = response.headers_mut();
            headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
            response
        }
        Err(err) => error_response(HttpError::from(err)),
    }
}

pub async fn health() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    insert_identity_headers(response.headers_mut());
    response
}

/// First `family` value of a query string, form-decoded.
fn family_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == "family")
        .map(|(_, value)| value.into_owned())
}

fn payload_response(payload: FontPayload) -> Response {
    let length = payload.body.len();
    let mut response = Response::new(Body::from(payload.body));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    match HeaderValue::from_str(&payload.content_type) {
        Ok(value) => {
            headers.insert(CONTENT_TYPE, value);
        }
        Err(err) => warn!(
            target = "fontproxy::http::fonts",
            content_type = %payload.content_type,
            error = %err,
            "Content type is not a valid header value; omitting it"
        ),
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        PAYLOAD_SOURCE_HEADER,
        HeaderValue::from_static(payload.source.as_str()),
    );
    insert_identity_headers(headers);

    response
}

fn error_response(error: HttpError) -> Response {
    let mut response = error.into_response();
    insert_identity_headers(response.headers_mut());
    response
}

fn insert_identity_headers(headers: &mut HeaderMap) {
    headers.insert(SERVER, HeaderValue::from_static(SERVER_NAME));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_param_is_form_decoded() {
        assert_eq!(
            family_param("family=Open+Sans%3A300%2C400%7CLato").as_deref(),
            Some("Open Sans:300,400|Lato")
        );
    }

    #[test]
    fn family_param_takes_first_occurrence() {
        assert_eq!(
            family_param("subset=latin&family=Roboto&family=Lato").as_deref(),
            Some("Roboto")
        );
    }

    #[test]
    fn family_param_absent() {
        assert_eq!(family_param("subset=latin"), None);
        assert_eq!(family_param("").as_deref(), None);
    }
}
