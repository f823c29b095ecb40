//! Client for the job-queue platform. Provisioning only needs to prove the
//! bearer token works; the product talks to the queue at runtime through
//! the env vars the saga writes.

use async_trait::async_trait;
use tracing::debug;

use launchpad_core::error::Result;
use launchpad_core::platform::{Platform, QueuePlatform};
use launchpad_core::request::QueueCredentials;

use crate::{status_error, transport_error, REQUEST_TIMEOUT};

pub struct QueueClient {
    base_url: String,
    http: reqwest::Client,
}

impl QueueClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        QueueClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl QueuePlatform for QueueClient {
    async fn verify_token(&self, creds: &QueueCredentials) -> Result<()> {
        let url = format!("{}/v2/keys", self.base_url);
        let resp = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", creds.token))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Queue, e))?;

        if !resp.status().is_success() {
            return Err(status_error(Platform::Queue, resp).await);
        }
        debug!("queue token verified");
        Ok(())
    }
}
