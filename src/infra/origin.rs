//! reqwest-backed origin client.

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    application::origin::{FetchError, OriginFetcher, OriginResponse},
    config::UpstreamSettings,
};

use super::error::InfraError;

/// Fetches upstream resources presenting the configured browser user agent.
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: Client,
}

impl HttpOrigin {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build upstream client: {err}"))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OriginFetcher for HttpOrigin {
    async fn fetch(&self, url: &str) -> Result<OriginResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| classify(url, err))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| classify(url, err))?;

        Ok(OriginResponse { status, body })
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_builder() {
        FetchError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
