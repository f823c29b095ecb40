//! Boundary traits for the four external platforms.
//!
//! The coordinator only ever talks to these traits; the HTTP
//! implementations live in `launchpad-platforms`, and the saga tests swap
//! in call-counting fakes. Every method builds a fresh request internally,
//! so retrying a method call never reuses a failed connection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::request::{CacheCredentials, DatabaseCredentials, HostingCredentials, QueueCredentials};

/// Which external party produced an error. Drives classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Hosting,
    Database,
    Queue,
    Cache,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Platform::Hosting => "hosting platform",
            Platform::Database => "database platform",
            Platform::Queue => "queue platform",
            Platform::Cache => "cache platform",
        })
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// One environment variable upserted into the hosting project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        EnvVar {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Lifecycle state of a managed database project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectState {
    ComingUp,
    ActiveHealthy,
    Paused,
    Other(String),
}

impl ProjectState {
    pub fn from_status(status: &str) -> Self {
        match status {
            "COMING_UP" | "RESTORING" | "UPGRADING" => ProjectState::ComingUp,
            "ACTIVE_HEALTHY" => ProjectState::ActiveHealthy,
            "INACTIVE" | "PAUSED" => ProjectState::Paused,
            other => ProjectState::Other(other.to_string()),
        }
    }
}

/// A managed database project, found or freshly created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseProject {
    /// Platform-assigned reference id (`ref` in the REST API).
    pub project_ref: String,
    pub name: String,
}

/// Keys and the direct SQL connection string resolved for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseKeys {
    pub anon_key: String,
    pub service_role_key: String,
    pub connection_string: String,
    pub api_url: String,
}

/// Lifecycle state of one hosting deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentState {
    Queued,
    Building,
    Ready,
    Error(String),
    Canceled,
}

impl DeploymentState {
    pub fn from_status(status: &str) -> Self {
        match status {
            "QUEUED" | "INITIALIZING" => DeploymentState::Queued,
            "BUILDING" => DeploymentState::Building,
            "READY" => DeploymentState::Ready,
            "CANCELED" => DeploymentState::Canceled,
            other => DeploymentState::Error(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Platform traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait HostingPlatform: Send + Sync {
    /// Verify the token can see the target project.
    async fn verify_project(&self, creds: &HostingCredentials) -> Result<()>;

    /// Upsert `vars` across every environment in `creds.targets`.
    /// Upserting the same key twice is a no-op, which is what makes the
    /// configure step safe to re-run.
    async fn upsert_env(&self, creds: &HostingCredentials, vars: &[EnvVar]) -> Result<()>;

    /// Kick off a new deployment; returns its id for status polling.
    async fn trigger_redeploy(&self, creds: &HostingCredentials) -> Result<String>;

    async fn deployment_state(
        &self,
        creds: &HostingCredentials,
        deployment_id: &str,
    ) -> Result<DeploymentState>;
}

#[async_trait]
pub trait DatabasePlatform: Send + Sync {
    /// Look the project up by name. A `None` means "create it"; an
    /// authorization failure here is how an invalid PAT surfaces.
    async fn find_project(&self, creds: &DatabaseCredentials) -> Result<Option<DatabaseProject>>;

    async fn create_project(&self, creds: &DatabaseCredentials) -> Result<DatabaseProject>;

    async fn project_state(
        &self,
        creds: &DatabaseCredentials,
        project_ref: &str,
    ) -> Result<ProjectState>;

    async fn api_keys(
        &self,
        creds: &DatabaseCredentials,
        project_ref: &str,
    ) -> Result<DatabaseKeys>;
}

#[async_trait]
pub trait QueuePlatform: Send + Sync {
    async fn verify_token(&self, creds: &QueueCredentials) -> Result<()>;
}

#[async_trait]
pub trait CachePlatform: Send + Sync {
    async fn verify(&self, creds: &CacheCredentials) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_state_parses_known_statuses() {
        assert_eq!(
            ProjectState::from_status("ACTIVE_HEALTHY"),
            ProjectState::ActiveHealthy
        );
        assert_eq!(ProjectState::from_status("COMING_UP"), ProjectState::ComingUp);
        assert_eq!(
            ProjectState::from_status("GOING_DOWN"),
            ProjectState::Other("GOING_DOWN".into())
        );
    }

    #[test]
    fn deployment_state_parses_known_statuses() {
        assert_eq!(DeploymentState::from_status("READY"), DeploymentState::Ready);
        assert_eq!(
            DeploymentState::from_status("BUILDING"),
            DeploymentState::Building
        );
        assert_eq!(
            DeploymentState::from_status("ERROR"),
            DeploymentState::Error("ERROR".into())
        );
    }
}
