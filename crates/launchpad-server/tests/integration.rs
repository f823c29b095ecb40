use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use tower::ServiceExt;

use launchpad_core::error::{ProvisionError, Result};
use launchpad_core::migrate::{DatabaseSetup, MigrateProgress};
use launchpad_core::platform::{
    CachePlatform, DatabaseKeys, DatabasePlatform, DatabaseProject, DeploymentState, EnvVar,
    HostingPlatform, Platform, ProjectState, QueuePlatform,
};
use launchpad_core::request::{
    AdminIdentity, CacheCredentials, DatabaseCredentials, HostingCredentials, QueueCredentials,
};
use launchpad_core::{Coordinator, ProgressEvent};
use launchpad_server::state::AppState;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeHosting {
    reject_token: bool,
    verify_calls: AtomicU32,
}

#[async_trait]
impl HostingPlatform for FakeHosting {
    async fn verify_project(&self, _creds: &HostingCredentials) -> Result<()> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_token {
            return Err(ProvisionError::Unauthorized {
                platform: Platform::Hosting,
                status: 401,
            });
        }
        Ok(())
    }

    async fn upsert_env(&self, _creds: &HostingCredentials, _vars: &[EnvVar]) -> Result<()> {
        Ok(())
    }

    async fn trigger_redeploy(&self, _creds: &HostingCredentials) -> Result<String> {
        Ok("dpl_1".into())
    }

    async fn deployment_state(
        &self,
        _creds: &HostingCredentials,
        _id: &str,
    ) -> Result<DeploymentState> {
        Ok(DeploymentState::Ready)
    }
}

#[derive(Default)]
struct FakeDatabase {
    find_calls: AtomicU32,
}

#[async_trait]
impl DatabasePlatform for FakeDatabase {
    async fn find_project(&self, _creds: &DatabaseCredentials) -> Result<Option<DatabaseProject>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(DatabaseProject {
            project_ref: "abcd1234".into(),
            name: "launchpad".into(),
        }))
    }

    async fn create_project(&self, _creds: &DatabaseCredentials) -> Result<DatabaseProject> {
        Ok(DatabaseProject {
            project_ref: "abcd1234".into(),
            name: "launchpad".into(),
        })
    }

    async fn project_state(
        &self,
        _creds: &DatabaseCredentials,
        _project_ref: &str,
    ) -> Result<ProjectState> {
        Ok(ProjectState::ActiveHealthy)
    }

    async fn api_keys(
        &self,
        _creds: &DatabaseCredentials,
        _project_ref: &str,
    ) -> Result<DatabaseKeys> {
        Ok(DatabaseKeys {
            anon_key: "anon".into(),
            service_role_key: "service".into(),
            connection_string: "postgres://postgres:pw@db.example.com:5432/postgres".into(),
            api_url: "https://abcd1234.db.example.com".into(),
        })
    }
}

struct FakeQueue;

#[async_trait]
impl QueuePlatform for FakeQueue {
    async fn verify_token(&self, _creds: &QueueCredentials) -> Result<()> {
        Ok(())
    }
}

struct FakeCache;

#[async_trait]
impl CachePlatform for FakeCache {
    async fn verify(&self, _creds: &CacheCredentials) -> Result<()> {
        Ok(())
    }
}

struct FakeSetup;

#[async_trait]
impl DatabaseSetup for FakeSetup {
    async fn apply_migrations(&self, _conn: &str, _progress: MigrateProgress<'_>) -> Result<u32> {
        Ok(6)
    }

    async fn bootstrap_admin(&self, _conn: &str, _admin: &AdminIdentity) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn app_with(hosting: Arc<FakeHosting>, database: Arc<FakeDatabase>) -> axum::Router {
    let coordinator = Coordinator::new(
        hosting,
        database,
        Arc::new(FakeQueue),
        Arc::new(FakeCache),
        Arc::new(FakeSetup),
    );
    launchpad_server::build_router(AppState::new(Arc::new(coordinator)))
}

fn app() -> axum::Router {
    app_with(
        Arc::new(FakeHosting::default()),
        Arc::new(FakeDatabase::default()),
    )
}

fn request_body() -> serde_json::Value {
    serde_json::json!({
        "hosting": {
            "access_token": "host-token",
            "project_id": "prj_123",
            "targets": ["production", "preview"],
        },
        "database": {
            "access_token": "sbp_pat",
            "project_name": "launchpad",
            "organization_id": "org_1",
            "region": "eu-central-1",
            "db_password": "pw",
        },
        "queue": {
            "token": "q-token",
            "current_signing_key": "sig-a",
            "next_signing_key": "sig-b",
        },
        "cache": {
            "rest_url": "https://cache.example.com",
            "rest_token": "c-token",
        },
        "admin": {
            "email": "owner@example.com",
            "password_hash": "$2b$12$hash",
        },
    })
}

/// POST the provisioning request and return (status, content-type, body text).
async fn post_provision(
    app: axum::Router,
    body: serde_json::Value,
) -> (StatusCode, String, String) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/provision")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8_lossy(&bytes).into())
}

/// Parse `data:`-framed SSE lines into progress events, skipping keep-alives.
fn parse_events(body: &str) -> Vec<ProgressEvent> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|data| serde_json::from_str(data).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let req = axum::http::Request::builder()
        .uri("/api/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn provision_streams_eleven_phases_then_complete() {
    let (status, content_type, body) = post_provision(app(), request_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        content_type.starts_with("text/event-stream"),
        "expected SSE, got {content_type}"
    );

    let events = parse_events(&body);
    let phases: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Phase { .. }))
        .collect();
    assert_eq!(phases.len(), 11);
    assert_eq!(events.last(), Some(&ProgressEvent::Complete { ok: true }));
}

#[tokio::test]
async fn provision_events_arrive_in_pipeline_order() {
    let (_, _, body) = post_provision(app(), request_body()).await;
    let events = parse_events(&body);

    let mut last_ordinal = None;
    for ev in &events {
        if let ProgressEvent::Phase { phase, .. } = ev {
            let ordinal = phase.ordinal();
            if let Some(last) = last_ordinal {
                assert!(ordinal > last, "phase {phase} out of order");
            }
            last_ordinal = Some(ordinal);
        }
    }
    assert_eq!(last_ordinal, Some(10));
}

#[tokio::test]
async fn bad_hosting_token_streams_one_phase_then_a_classified_error() {
    let hosting = Arc::new(FakeHosting {
        reject_token: true,
        ..FakeHosting::default()
    });
    let database = Arc::new(FakeDatabase::default());
    let app = app_with(hosting, database.clone());

    let (status, _, body) = post_provision(app, request_body()).await;
    assert_eq!(status, StatusCode::OK);

    let events = parse_events(&body);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], ProgressEvent::Phase { .. }));
    match &events[1] {
        ProgressEvent::Error { kind, .. } => {
            assert_eq!(kind.as_str(), "hosting_token");
        }
        other => panic!("expected error event, got {other:?}"),
    }
    assert_eq!(
        database.find_calls.load(Ordering::SeqCst),
        0,
        "no database call may happen after a hosting failure"
    );
}

#[tokio::test]
async fn blank_credential_field_returns_400_without_streaming() {
    let mut body = request_body();
    body["queue"]["token"] = serde_json::json!("");

    let (status, content_type, text) = post_provision(app(), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(content_type.contains("application/json"));
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(json["error"].as_str().unwrap().contains("queue.token"));
}

#[tokio::test]
async fn missing_credential_group_is_rejected_by_deserialization() {
    let mut body = request_body();
    body.as_object_mut().unwrap().remove("cache");

    let (status, _, _) = post_provision(app(), body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
