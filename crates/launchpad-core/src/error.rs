use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::Platform;
use crate::step::StepId;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("missing or invalid field: {0}")]
    InvalidRequest(String),

    #[error("{platform} rejected the credential (HTTP {status})")]
    Unauthorized { platform: Platform, status: u16 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{platform} project '{id}' not found")]
    ProjectNotFound { platform: Platform, id: String },

    #[error("invalid cache REST URL: {0}")]
    InvalidCacheUrl(String),

    #[error("unexpected response from {platform}: HTTP {status}: {body}")]
    UnexpectedStatus {
        platform: Platform,
        status: u16,
        body: String,
    },

    #[error("network error talking to {platform}: {message}")]
    Network { platform: Platform, message: String },

    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },

    #[error("migration '{file}' failed: {message}")]
    Migration { file: String, message: String },

    #[error("deployment finished in state {0}")]
    DeployFailed(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Closed set of user-facing error categories. Each maps to the credential
/// screen the wizard should send the user back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    HostingToken,
    DatabasePat,
    QueueToken,
    CacheUrl,
    CacheToken,
    Network,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::HostingToken => "hosting_token",
            ErrorKind::DatabasePat => "database_pat",
            ErrorKind::QueueToken => "queue_token",
            ErrorKind::CacheUrl => "cache_url",
            ErrorKind::CacheToken => "cache_token",
            ErrorKind::Network => "network",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// The credential-collection step the wizard should return to, if any.
    pub fn return_to(self) -> Option<StepId> {
        match self {
            ErrorKind::HostingToken => Some(StepId::VerifyHosting),
            ErrorKind::DatabasePat => Some(StepId::EnsureDatabaseProject),
            ErrorKind::QueueToken => Some(StepId::VerifyQueue),
            ErrorKind::CacheUrl | ErrorKind::CacheToken => Some(StepId::VerifyCache),
            ErrorKind::Network | ErrorKind::Unknown => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProvisionError {
    /// Map a raw failure into the closed user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisionError::Unauthorized { platform, .. } => match platform {
                Platform::Hosting => ErrorKind::HostingToken,
                Platform::Database => ErrorKind::DatabasePat,
                Platform::Queue => ErrorKind::QueueToken,
                Platform::Cache => ErrorKind::CacheToken,
            },
            // A missing project means the id on that platform's credential
            // screen is wrong, so route the user back there.
            ProvisionError::ProjectNotFound { platform, .. } => match platform {
                Platform::Hosting => ErrorKind::HostingToken,
                Platform::Database => ErrorKind::DatabasePat,
                Platform::Queue | Platform::Cache => ErrorKind::Unknown,
            },
            ProvisionError::InvalidCacheUrl(_) => ErrorKind::CacheUrl,
            ProvisionError::Network { .. } => ErrorKind::Network,
            ProvisionError::Database(e) => match e {
                sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => {
                    ErrorKind::Network
                }
                _ => ErrorKind::Unknown,
            },
            // Local filesystem failures (missing migration directory) are
            // operator errors, not transient network conditions.
            ProvisionError::Io(_)
            | ProvisionError::InvalidRequest(_)
            | ProvisionError::NotFound(_)
            | ProvisionError::UnexpectedStatus { .. }
            | ProvisionError::Timeout { .. }
            | ProvisionError::Migration { .. }
            | ProvisionError::DeployFailed(_) => ErrorKind::Unknown,
        }
    }

    /// Only `network`-classified failures are eligible for automatic retry.
    /// Everything else needs the user to fix an input and restart the saga.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
