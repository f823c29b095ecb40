//! Client for the key-value cache platform. The REST URL comes from the
//! user (it is per-database on this platform), so the probe both validates
//! the URL shape and proves the token against a `ping`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use launchpad_core::error::{ProvisionError, Result};
use launchpad_core::platform::{CachePlatform, Platform};
use launchpad_core::request::CacheCredentials;

use crate::{status_error, transport_error, REQUEST_TIMEOUT};

#[derive(Default)]
pub struct CacheClient {
    http: reqwest::Client,
}

impl CacheClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Deserialize)]
struct PingResponse {
    result: String,
}

#[async_trait]
impl CachePlatform for CacheClient {
    async fn verify(&self, creds: &CacheCredentials) -> Result<()> {
        let base = creds.rest_url.trim_end_matches('/');
        let url = format!("{base}/ping");
        // A URL reqwest cannot even build is a user-input problem, not a
        // network one.
        if reqwest::Url::parse(&url).is_err() {
            return Err(ProvisionError::InvalidCacheUrl(creds.rest_url.clone()));
        }

        let resp = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", creds.rest_token))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    ProvisionError::InvalidCacheUrl(creds.rest_url.clone())
                } else {
                    transport_error(Platform::Cache, e)
                }
            })?;

        if !resp.status().is_success() {
            return Err(status_error(Platform::Cache, resp).await);
        }
        let ping: PingResponse = resp
            .json()
            .await
            .map_err(|e| transport_error(Platform::Cache, e))?;
        if !ping.result.eq_ignore_ascii_case("pong") {
            return Err(ProvisionError::UnexpectedStatus {
                platform: Platform::Cache,
                status: 200,
                body: ping.result,
            });
        }
        debug!("cache credentials verified");
        Ok(())
    }
}
