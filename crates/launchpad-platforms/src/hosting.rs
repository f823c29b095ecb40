//! Client for the hosting/deployment platform.
//!
//! Four operations back four saga steps: project verification, env-var
//! upserts, triggering a redeploy, and deployment status polls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use launchpad_core::error::{ProvisionError, Result};
use launchpad_core::platform::{DeploymentState, EnvVar, HostingPlatform, Platform};
use launchpad_core::request::HostingCredentials;

use crate::{status_error, transport_error, REQUEST_TIMEOUT};

pub struct HostingClient {
    base_url: String,
    http: reqwest::Client,
}

impl HostingClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        HostingClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn bearer(&self, creds: &HostingCredentials) -> String {
        format!("Bearer {}", creds.access_token)
    }
}

/// Body for the env upsert endpoint: one entry per variable, written to
/// every requested target environment.
#[derive(Serialize)]
struct EnvUpsertEntry<'a> {
    key: &'a str,
    value: &'a str,
    target: &'a [String],
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct DeploymentResponse {
    id: String,
}

#[derive(Deserialize)]
struct DeploymentStatusResponse {
    #[serde(rename = "readyState")]
    ready_state: String,
}

#[async_trait]
impl HostingPlatform for HostingClient {
    async fn verify_project(&self, creds: &HostingCredentials) -> Result<()> {
        let url = format!("{}/v9/projects/{}", self.base_url, creds.project_id);
        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.bearer(creds))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Hosting, e))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProvisionError::ProjectNotFound {
                platform: Platform::Hosting,
                id: creds.project_id.clone(),
            });
        }
        if !resp.status().is_success() {
            return Err(status_error(Platform::Hosting, resp).await);
        }
        debug!(project = %creds.project_id, "hosting project verified");
        Ok(())
    }

    async fn upsert_env(&self, creds: &HostingCredentials, vars: &[EnvVar]) -> Result<()> {
        let url = format!(
            "{}/v10/projects/{}/env?upsert=true",
            self.base_url, creds.project_id
        );
        let body: Vec<EnvUpsertEntry<'_>> = vars
            .iter()
            .map(|v| EnvUpsertEntry {
                key: &v.key,
                value: &v.value,
                target: &creds.targets,
                kind: "encrypted",
            })
            .collect();

        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.bearer(creds))
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Hosting, e))?;

        if !resp.status().is_success() {
            return Err(status_error(Platform::Hosting, resp).await);
        }
        debug!(count = vars.len(), "environment variables upserted");
        Ok(())
    }

    async fn trigger_redeploy(&self, creds: &HostingCredentials) -> Result<String> {
        let url = format!("{}/v13/deployments", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.bearer(creds))
            .json(&serde_json::json!({
                "name": creds.project_id,
                "project": creds.project_id,
                "target": "production",
            }))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Hosting, e))?;

        if !resp.status().is_success() {
            return Err(status_error(Platform::Hosting, resp).await);
        }
        let deployment: DeploymentResponse = resp
            .json()
            .await
            .map_err(|e| transport_error(Platform::Hosting, e))?;
        debug!(deployment = %deployment.id, "redeploy triggered");
        Ok(deployment.id)
    }

    async fn deployment_state(
        &self,
        creds: &HostingCredentials,
        deployment_id: &str,
    ) -> Result<DeploymentState> {
        let url = format!("{}/v13/deployments/{}", self.base_url, deployment_id);
        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.bearer(creds))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Hosting, e))?;

        if !resp.status().is_success() {
            return Err(status_error(Platform::Hosting, resp).await);
        }
        let status: DeploymentStatusResponse = resp
            .json()
            .await
            .map_err(|e| transport_error(Platform::Hosting, e))?;
        Ok(DeploymentState::from_status(&status.ready_state))
    }
}
