//! The immutable input to one saga run.
//!
//! Deserialized from the provisioning POST body, validated exactly once at
//! saga start, and passed by reference everywhere after that. Secrets are
//! redacted from `Debug` output so a stray log line never leaks a token.

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

#[derive(Clone, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub hosting: HostingCredentials,
    pub database: DatabaseCredentials,
    pub queue: QueueCredentials,
    pub cache: CacheCredentials,
    pub admin: AdminIdentity,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct HostingCredentials {
    pub access_token: String,
    pub project_id: String,
    /// Environment names the product's variables are written to.
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
}

fn default_targets() -> Vec<String> {
    vec!["production".into(), "preview".into()]
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    pub access_token: String,
    pub project_name: String,
    pub organization_id: String,
    pub region: String,
    /// Password for the database user, used only when the project must be
    /// created from scratch.
    pub db_password: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct QueueCredentials {
    pub token: String,
    pub current_signing_key: String,
    pub next_signing_key: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CacheCredentials {
    pub rest_url: String,
    pub rest_token: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub email: String,
    /// Already hashed client-side; the saga never sees the plaintext.
    pub password_hash: String,
}

impl ProvisionRequest {
    /// Reject a request with any missing or blank field before the saga
    /// starts. Returns the offending field path so the wizard can highlight
    /// the exact input.
    pub fn validate(&self) -> Result<()> {
        let fields: [(&str, &str); 13] = [
            ("hosting.access_token", &self.hosting.access_token),
            ("hosting.project_id", &self.hosting.project_id),
            ("database.access_token", &self.database.access_token),
            ("database.project_name", &self.database.project_name),
            ("database.organization_id", &self.database.organization_id),
            ("database.region", &self.database.region),
            ("database.db_password", &self.database.db_password),
            ("queue.token", &self.queue.token),
            ("queue.current_signing_key", &self.queue.current_signing_key),
            ("queue.next_signing_key", &self.queue.next_signing_key),
            ("cache.rest_url", &self.cache.rest_url),
            ("cache.rest_token", &self.cache.rest_token),
            ("admin.email", &self.admin.email),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ProvisionError::InvalidRequest(name.to_string()));
            }
        }
        if self.admin.password_hash.trim().is_empty() {
            return Err(ProvisionError::InvalidRequest("admin.password_hash".into()));
        }
        if self.hosting.targets.is_empty() {
            return Err(ProvisionError::InvalidRequest("hosting.targets".into()));
        }
        if !self.cache.rest_url.starts_with("https://") {
            return Err(ProvisionError::InvalidCacheUrl(self.cache.rest_url.clone()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProvisionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionRequest")
            .field("hosting.project_id", &self.hosting.project_id)
            .field("database.project_name", &self.database.project_name)
            .field("database.region", &self.database.region)
            .field("cache.rest_url", &self.cache.rest_url)
            .field("admin.email", &self.admin.email)
            .finish_non_exhaustive()
    }
}

/// Fully populated request used across the crate's test modules.
#[cfg(test)]
pub(crate) fn sample_request() -> ProvisionRequest {
    ProvisionRequest {
        hosting: HostingCredentials {
            access_token: "host-token".into(),
            project_id: "prj_123".into(),
            targets: vec!["production".into(), "preview".into()],
        },
        database: DatabaseCredentials {
            access_token: "sbp_pat".into(),
            project_name: "launchpad".into(),
            organization_id: "org_1".into(),
            region: "eu-central-1".into(),
            db_password: "s3cret-db-pass".into(),
        },
        queue: QueueCredentials {
            token: "q-token".into(),
            current_signing_key: "sig-current".into(),
            next_signing_key: "sig-next".into(),
        },
        cache: CacheCredentials {
            rest_url: "https://cache.example.com".into(),
            rest_token: "c-token".into(),
        },
        admin: AdminIdentity {
            email: "owner@example.com".into(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProvisionRequest {
        sample_request()
    }

    #[test]
    fn valid_request_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn blank_field_reports_its_path() {
        let mut req = sample();
        req.queue.token = "  ".into();
        match req.validate() {
            Err(ProvisionError::InvalidRequest(field)) => assert_eq!(field, "queue.token"),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn non_https_cache_url_is_rejected_as_cache_url() {
        let mut req = sample();
        req.cache.rest_url = "http://cache.example.com".into();
        assert!(matches!(
            req.validate(),
            Err(ProvisionError::InvalidCacheUrl(_))
        ));
    }

    #[test]
    fn empty_target_list_is_rejected() {
        let mut req = sample();
        req.hosting.targets.clear();
        assert!(matches!(
            req.validate(),
            Err(ProvisionError::InvalidRequest(f)) if f == "hosting.targets"
        ));
    }

    #[test]
    fn debug_output_never_contains_secrets() {
        let req = sample();
        let dump = format!("{req:?}");
        assert!(!dump.contains("host-token"));
        assert!(!dump.contains("sbp_pat"));
        assert!(!dump.contains("s3cret-db-pass"));
        assert!(!dump.contains("$2b$12$"));
        assert!(dump.contains("prj_123"));
    }

    #[test]
    fn targets_default_when_omitted() {
        let json = serde_json::json!({
            "access_token": "t",
            "project_id": "p",
        });
        let creds: HostingCredentials = serde_json::from_value(json).unwrap();
        assert_eq!(creds.targets, vec!["production", "preview"]);
    }
}
