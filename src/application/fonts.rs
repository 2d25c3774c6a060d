//! Cache-aside pipeline for stylesheets and font assets.
//!
//! Each request consults the disk cache first. Fresh entries are served as
//! stored; stale entries are evicted and refetched. Stylesheets fetched from
//! the origin are rewritten so their asset URLs point at this proxy before
//! they are persisted. A failed cache write never fails the request.

use std::{path::Path, sync::Arc, time::Instant};

use axum::http::StatusCode;
use bytes::Bytes;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::Settings,
    domain::{
        keys::derive_key,
        resource::{ResourceKind, asset_content_type},
        rewrite::rewrite,
    },
    infra::{
        cache_store::CacheStoreError,
        telemetry::{
            METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_STALE, METRIC_CACHE_WRITE_ERROR,
            METRIC_ORIGIN_ERROR, METRIC_ORIGIN_FETCH_MS,
        },
    },
};

use super::{
    cache::FontCache,
    origin::{FetchError, OriginFetcher},
};

pub const STYLESHEET_CONTENT_TYPE: &str = "text/css; charset=utf-8";

const STYLESHEET_ENDPOINT: &str = "css";

/// Upstream and public endpoints the pipeline needs, frozen at startup.
#[derive(Debug, Clone)]
pub struct FontProxyConfig {
    pub stylesheet_base: String,
    pub asset_base: String,
    pub public_base_url: String,
}

impl From<&Settings> for FontProxyConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            stylesheet_base: settings.upstream.stylesheet_base.clone(),
            asset_base: settings.upstream.asset_base.clone(),
            public_base_url: settings.server.public_base_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    Cache,
    Origin,
}

impl PayloadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadSource::Cache => "cache",
            PayloadSource::Origin => "origin",
        }
    }
}

/// A servable body together with its media type and provenance.
#[derive(Debug, Clone)]
pub struct FontPayload {
    pub body: Bytes,
    pub content_type: String,
    pub source: PayloadSource,
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("missing font family")]
    MissingFamily,
    #[error("invalid asset path `{path}`: {reason}")]
    InvalidAssetPath { path: String, reason: &'static str },
    #[error("upstream unreachable")]
    UpstreamUnreachable(#[source] FetchError),
    /// The origin answered with something other than 200; relayed as-is.
    #[error("upstream responded with status {status}")]
    UpstreamStatus { status: StatusCode, body: Bytes },
    #[error("cache unavailable")]
    Storage(#[source] CacheStoreError),
}

pub struct FontProxyService {
    store: Arc<dyn FontCache>,
    origin: Arc<dyn OriginFetcher>,
    config: FontProxyConfig,
}

impl FontProxyService {
    pub fn new(
        store: Arc<dyn FontCache>,
        origin: Arc<dyn OriginFetcher>,
        config: FontProxyConfig,
    ) -> Self {
        Self {
            store,
            origin,
            config,
        }
    }

    /// Serve the stylesheet for a family list such as `Roboto:400,700|Lato`.
    pub async fn stylesheet(&self, family: Option<&str>) -> Result<FontPayload, ProxyError> {
        let family = family
            .map(str::trim)
            .filter(|family| !family.is_empty())
            .ok_or(ProxyError::MissingFamily)?;

        let key = derive_key(family);
        let path = self
            .store
            .locate(ResourceKind::Stylesheet, &key)
            .map_err(ProxyError::Storage)?;
        let url = stylesheet_url(&self.config.stylesheet_base, family)
            .map_err(ProxyError::UpstreamUnreachable)?;

        let (body, source) = self
            .cache_aside(ResourceKind::Stylesheet, &path, &url, |body| {
                rewrite(
                    &body,
                    &self.config.asset_base,
                    &self.config.public_base_url,
                )
            })
            .await?;

        Ok(FontPayload {
            body,
            content_type: STYLESHEET_CONTENT_TYPE.to_string(),
            source,
        })
    }

    /// Serve a font file by its request path, e.g. `/s/roboto/v30/abc.woff2`.
    pub async fn asset(&self, request_path: &str) -> Result<FontPayload, ProxyError> {
        let content_type =
            asset_content_type(request_path).ok_or_else(|| ProxyError::InvalidAssetPath {
                path: request_path.to_string(),
                reason: "missing file extension",
            })?;

        let path = self
            .store
            .locate(ResourceKind::Asset, request_path)
            .map_err(|err| match err {
                CacheStoreError::InvalidKey { .. } => ProxyError::InvalidAssetPath {
                    path: request_path.to_string(),
                    reason: "path is not a plain relative file path",
                },
                other => ProxyError::Storage(other),
            })?;
        let url = format!("{}{request_path}", self.config.asset_base);

        let (body, source) = self
            .cache_aside(ResourceKind::Asset, &path, &url, |body| body)
            .await?;

        Ok(FontPayload {
            body,
            content_type,
            source,
        })
    }

    async fn cache_aside<F>(
        &self,
        kind: ResourceKind,
        path: &Path,
        url: &str,
        transform: F,
    ) -> Result<(Bytes, PayloadSource), ProxyError>
    where
        F: FnOnce(Bytes) -> Bytes,
    {
        if self.store.is_fresh(path).await {
            match self.store.read(path).await {
                Ok(body) => {
                    counter!(METRIC_CACHE_HIT, "kind" => kind.as_str()).increment(1);
                    debug!(
                        target = "fontproxy::proxy",
                        op = "cache_aside",
                        kind = kind.as_str(),
                        result = "cache_hit",
                        path = %path.display(),
                        bytes = body.len(),
                        "Served from cache"
                    );
                    return Ok((body, PayloadSource::Cache));
                }
                Err(err) => {
                    warn!(
                        target = "fontproxy::proxy",
                        op = "cache_aside",
                        kind = kind.as_str(),
                        result = "cache_read_error",
                        path = %path.display(),
                        error = %err,
                        "Failed to read cached entry; refetching"
                    );
                }
            }
        } else if self.store.is_stale_existing(path).await {
            counter!(METRIC_CACHE_STALE, "kind" => kind.as_str()).increment(1);
            debug!(
                target = "fontproxy::proxy",
                op = "cache_aside",
                kind = kind.as_str(),
                result = "cache_stale",
                path = %path.display(),
                "Evicted stale entry"
            );
        }

        counter!(METRIC_CACHE_MISS, "kind" => kind.as_str()).increment(1);

        let started_at = Instant::now();
        let fetched = self.origin.fetch(url).await;
        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_ORIGIN_FETCH_MS, "kind" => kind.as_str()).record(elapsed_ms);

        let response = match fetched {
            Ok(response) => response,
            Err(err) => {
                counter!(METRIC_ORIGIN_ERROR, "kind" => kind.as_str()).increment(1);
                warn!(
                    target = "fontproxy::proxy",
                    op = "cache_aside",
                    kind = kind.as_str(),
                    result = "origin_error",
                    url = url,
                    elapsed_ms = elapsed_ms as u64,
                    error = %err,
                    "Origin fetch failed"
                );
                return Err(ProxyError::UpstreamUnreachable(err));
            }
        };

        if response.status != StatusCode::OK {
            info!(
                target = "fontproxy::proxy",
                op = "cache_aside",
                kind = kind.as_str(),
                result = "origin_status",
                url = url,
                status = response.status.as_u16(),
                "Relaying non-success origin response"
            );
            return Err(ProxyError::UpstreamStatus {
                status: response.status,
                body: response.body,
            });
        }

        let body = transform(response.body);

        if let Err(err) = self.store.write(path, body.clone()).await {
            counter!(METRIC_CACHE_WRITE_ERROR, "kind" => kind.as_str()).increment(1);
            warn!(
                target = "fontproxy::proxy",
                op = "cache_aside",
                kind = kind.as_str(),
                result = "cache_write_error",
                path = %path.display(),
                error = %err,
                "Failed to persist origin payload; serving uncached"
            );
        } else {
            info!(
                target = "fontproxy::proxy",
                op = "cache_aside",
                kind = kind.as_str(),
                result = "cache_fill",
                path = %path.display(),
                bytes = body.len(),
                elapsed_ms = elapsed_ms as u64,
                "Fetched from origin and cached"
            );
        }

        Ok((body, PayloadSource::Origin))
    }
}

fn stylesheet_url(base: &str, family: &str) -> Result<String, FetchError> {
    let endpoint = format!("{base}/{STYLESHEET_ENDPOINT}");
    Url::parse_with_params(&endpoint, &[("family", family)])
        .map(String::from)
        .map_err(|err| FetchError::InvalidUrl {
            url: endpoint,
            reason: err.to_string(),
        })
}
