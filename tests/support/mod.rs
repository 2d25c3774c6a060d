#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    path::Path,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use bytes::Bytes;
use fontproxy::{
    application::{
        fonts::{FontProxyConfig, FontProxyService},
        origin::{FetchError, OriginFetcher, OriginResponse},
    },
    infra::{
        cache_store::CacheStore,
        http::{FontsState, build_router},
    },
};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const STYLESHEET_BASE: &str = "https://fonts.googleapis.com";
pub const ASSET_BASE: &str = "https://fonts.gstatic.com";
pub const PUBLIC_BASE: &str = "https://fonts.example.net";

/// In-memory origin answering from per-URL reply queues and counting calls.
#[derive(Default)]
pub struct ScriptedOrigin {
    replies: Mutex<HashMap<String, VecDeque<Result<OriginResponse, FetchError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOrigin {
    pub fn reply(&self, url: &str, status: StatusCode, body: impl Into<Bytes>) {
        self.push(url, Ok(OriginResponse::new(status, body)));
    }

    pub fn fail(&self, url: &str, error: FetchError) {
        self.push(url, Err(error));
    }

    fn push(&self, url: &str, reply: Result<OriginResponse, FetchError>) {
        self.replies
            .lock()
            .expect("replies lock")
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl OriginFetcher for ScriptedOrigin {
    async fn fetch(&self, url: &str) -> Result<OriginResponse, FetchError> {
        self.calls.lock().expect("calls lock").push(url.to_string());
        self.replies
            .lock()
            .expect("replies lock")
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(FetchError::Transport {
                    url: url.to_string(),
                    message: "no scripted reply".to_string(),
                })
            })
    }
}

pub struct TestProxy {
    pub router: Router,
    pub origin: Arc<ScriptedOrigin>,
    pub store: Arc<CacheStore>,
}

pub fn proxy(root: &Path, ttl: Duration) -> TestProxy {
    let origin = Arc::new(ScriptedOrigin::default());
    let store = Arc::new(CacheStore::new(root.to_path_buf(), ttl).expect("cache store"));
    let service = FontProxyService::new(
        store.clone(),
        origin.clone(),
        FontProxyConfig {
            stylesheet_base: STYLESHEET_BASE.to_string(),
            asset_base: ASSET_BASE.to_string(),
            public_base_url: PUBLIC_BASE.to_string(),
        },
    );
    let router = build_router(FontsState {
        service: Arc::new(service),
    });

    TestProxy {
        router,
        origin,
        store,
    }
}

pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
}

pub fn backdate(path: &Path, age: Duration) {
    std::fs::File::options()
        .write(true)
        .open(path)
        .expect("open cached entry")
        .set_modified(SystemTime::now() - age)
        .expect("backdate cached entry");
}
