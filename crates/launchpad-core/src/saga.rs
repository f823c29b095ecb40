//! The provisioning saga coordinator.
//!
//! Executes the fixed step pipeline strictly sequentially: no step starts
//! before the previous one's terminal event is emitted, because later steps
//! consume values (API keys, the connection string) resolved by earlier
//! ones. Forward-only: nothing is rolled back on failure. Every step is
//! idempotent or precondition-guarded, so re-running the whole saga from
//! the top is always the recovery path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};

use crate::error::{ErrorKind, ProvisionError, Result};
use crate::event::ProgressEvent;
use crate::migrate::{DatabaseSetup, MigrateEvent};
use crate::platform::{
    CachePlatform, DatabaseKeys, DatabasePlatform, DeploymentState, EnvVar, HostingPlatform,
    ProjectState, QueuePlatform,
};
use crate::poll::wait_until_ready;
use crate::request::ProvisionRequest;
use crate::retry::run_with_retries;
use crate::step::StepId;

// ---------------------------------------------------------------------------
// Outcome & tuning
// ---------------------------------------------------------------------------

/// Terminal result of one saga run. Failures have already been emitted as a
/// wire `error` event by the time the caller sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome {
    Completed,
    Failed {
        step: StepId,
        kind: ErrorKind,
        message: String,
    },
    /// The event receiver went away (page closed, request aborted). The
    /// saga stops making progress; no cleanup beyond closing handles.
    Cancelled,
}

/// Timeouts and poll intervals for the readiness waits.
#[derive(Debug, Clone)]
pub struct SagaConfig {
    pub database_active_timeout: Duration,
    pub database_poll_interval: Duration,
    pub deployment_timeout: Duration,
    pub deployment_poll_interval: Duration,
}

impl Default for SagaConfig {
    fn default() -> Self {
        SagaConfig {
            database_active_timeout: Duration::from_secs(180),
            database_poll_interval: Duration::from_secs(4),
            deployment_timeout: Duration::from_secs(240),
            deployment_poll_interval: Duration::from_secs(5),
        }
    }
}

/// Values resolved by earlier steps and consumed by later ones.
#[derive(Default)]
struct SagaContext {
    project_ref: Option<String>,
    keys: Option<DatabaseKeys>,
    deployment_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

pub struct Coordinator {
    hosting: Arc<dyn HostingPlatform>,
    database: Arc<dyn DatabasePlatform>,
    queue: Arc<dyn QueuePlatform>,
    cache: Arc<dyn CachePlatform>,
    db_setup: Arc<dyn DatabaseSetup>,
    config: SagaConfig,
}

impl Coordinator {
    pub fn new(
        hosting: Arc<dyn HostingPlatform>,
        database: Arc<dyn DatabasePlatform>,
        queue: Arc<dyn QueuePlatform>,
        cache: Arc<dyn CachePlatform>,
        db_setup: Arc<dyn DatabaseSetup>,
    ) -> Self {
        Coordinator {
            hosting,
            database,
            queue,
            cache,
            db_setup,
            config: SagaConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SagaConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the full pipeline, emitting one `phase` event per step, `retry`
    /// events for re-attempts, and exactly one terminal `error` or
    /// `complete` event.
    pub async fn run(
        &self,
        request: ProvisionRequest,
        tx: UnboundedSender<ProgressEvent>,
    ) -> SagaOutcome {
        if let Err(e) = request.validate() {
            let step = StepId::VerifyHosting;
            let _ = tx.send(fatal_event(step, &e));
            return SagaOutcome::Failed {
                step,
                kind: e.kind(),
                message: e.to_string(),
            };
        }

        let mut ctx = SagaContext::default();
        for step in StepId::ALL {
            if tx.send(ProgressEvent::phase(step)).is_err() {
                info!(step = %step, "event receiver gone, stopping saga");
                return SagaOutcome::Cancelled;
            }
            info!(step = %step, progress = step.progress(), "step started");

            if let Err(e) = self.run_step(step, &request, &mut ctx, &tx).await {
                let kind = e.kind();
                error!(step = %step, kind = %kind, error = %e, "provisioning step failed");
                let _ = tx.send(fatal_event(step, &e));
                return SagaOutcome::Failed {
                    step,
                    kind,
                    message: e.to_string(),
                };
            }
        }

        info!("provisioning complete");
        let _ = tx.send(ProgressEvent::Complete { ok: true });
        SagaOutcome::Completed
    }

    async fn run_step(
        &self,
        step: StepId,
        req: &ProvisionRequest,
        ctx: &mut SagaContext,
        tx: &UnboundedSender<ProgressEvent>,
    ) -> Result<()> {
        let policy = step.retry_policy();
        let on_retry = |n: u32, max: u32| {
            // A failed attempt never reuses its connection; the factory
            // below builds a fresh request/connection each invocation.
            let _ = tx.send(ProgressEvent::retry(step, n, max));
        };

        match step {
            StepId::VerifyHosting => {
                run_with_retries(policy, on_retry, || {
                    self.hosting.verify_project(&req.hosting)
                })
                .await
            }

            StepId::EnsureDatabaseProject => {
                let project = run_with_retries(policy, on_retry, || async {
                    // Create-or-reuse is the idempotency guard: a second
                    // saga run finds the project and skips creation.
                    match self.database.find_project(&req.database).await? {
                        Some(existing) => {
                            info!(project_ref = %existing.project_ref, "reusing existing database project");
                            Ok(existing)
                        }
                        None => {
                            info!(name = %req.database.project_name, "creating database project");
                            self.database.create_project(&req.database).await
                        }
                    }
                })
                .await?;
                ctx.project_ref = Some(project.project_ref);
                Ok(())
            }

            StepId::WaitDatabaseActive => {
                let project_ref = require(ctx.project_ref.as_deref(), "database project reference")?;
                wait_until_ready(
                    "database project to become active",
                    self.config.database_active_timeout,
                    self.config.database_poll_interval,
                    |elapsed| debug!(step = %step, elapsed_secs = elapsed.as_secs(), "still waiting"),
                    || async {
                        let state = self.database.project_state(&req.database, project_ref).await?;
                        Ok(state == ProjectState::ActiveHealthy)
                    },
                )
                .await
            }

            StepId::ResolveDatabaseKeys => {
                let project_ref = require(ctx.project_ref.as_deref(), "database project reference")?;
                let keys = run_with_retries(policy, on_retry, || {
                    self.database.api_keys(&req.database, project_ref)
                })
                .await?;
                ctx.keys = Some(keys);
                Ok(())
            }

            StepId::VerifyQueue => {
                run_with_retries(policy, on_retry, || self.queue.verify_token(&req.queue)).await
            }

            StepId::VerifyCache => {
                run_with_retries(policy, on_retry, || self.cache.verify(&req.cache)).await
            }

            StepId::ConfigureHostingEnv => {
                let keys = require(ctx.keys.as_ref(), "database keys")?;
                let vars = product_env(req, keys);
                run_with_retries(policy, on_retry, || {
                    self.hosting.upsert_env(&req.hosting, &vars)
                })
                .await
            }

            StepId::RunMigrations => {
                let keys = require(ctx.keys.as_ref(), "database keys")?;
                let conn_str = keys.connection_string.clone();
                let progress_tx = tx.clone();
                let progress = move |ev: MigrateEvent| match ev {
                    MigrateEvent::ConnectRetry {
                        attempt,
                        max_attempts,
                    } => {
                        let _ = progress_tx.send(ProgressEvent::retry(
                            StepId::RunMigrations,
                            attempt,
                            max_attempts,
                        ));
                    }
                    MigrateEvent::WaitingForStorage { elapsed } => {
                        debug!(elapsed_secs = elapsed.as_secs(), "waiting for storage schema");
                    }
                    MigrateEvent::Applying { file } => debug!(file = %file, "applying migration"),
                    MigrateEvent::Applied { .. } | MigrateEvent::AlreadyPresent { .. } => {}
                };
                let applied = self
                    .db_setup
                    .apply_migrations(&conn_str, &progress)
                    .await?;
                info!(applied, "schema migrations applied");
                Ok(())
            }

            StepId::BootstrapAdmin => {
                let keys = require(ctx.keys.as_ref(), "database keys")?;
                let conn_str = keys.connection_string.clone();
                run_with_retries(policy, on_retry, || {
                    self.db_setup.bootstrap_admin(&conn_str, &req.admin)
                })
                .await
            }

            StepId::TriggerRedeploy => {
                let deployment_id = run_with_retries(policy, on_retry, || {
                    self.hosting.trigger_redeploy(&req.hosting)
                })
                .await?;
                ctx.deployment_id = Some(deployment_id);
                Ok(())
            }

            StepId::WaitDeploymentReady => {
                let deployment_id = require(ctx.deployment_id.as_deref(), "deployment id")?;
                wait_until_ready(
                    "deployment to become ready",
                    self.config.deployment_timeout,
                    self.config.deployment_poll_interval,
                    |elapsed| debug!(step = %step, elapsed_secs = elapsed.as_secs(), "still waiting"),
                    || async {
                        match self.hosting.deployment_state(&req.hosting, deployment_id).await? {
                            DeploymentState::Ready => Ok(true),
                            DeploymentState::Queued | DeploymentState::Building => Ok(false),
                            DeploymentState::Canceled => {
                                Err(ProvisionError::DeployFailed("CANCELED".into()))
                            }
                            DeploymentState::Error(state) => {
                                Err(ProvisionError::DeployFailed(state))
                            }
                        }
                    },
                )
                .await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| ProvisionError::NotFound(what.to_string()))
}

fn fatal_event(step: StepId, e: &ProvisionError) -> ProgressEvent {
    ProgressEvent::Error {
        error: user_message(e),
        kind: e.kind(),
        step_id: Some(step),
    }
}

/// Compose the raw failure with the "which credential to fix" hint.
fn user_message(e: &ProvisionError) -> String {
    let hint = match e.kind() {
        ErrorKind::HostingToken => "Check the hosting access token and project id.",
        ErrorKind::DatabasePat => "Check the database platform access token.",
        ErrorKind::QueueToken => "Check the queue token.",
        ErrorKind::CacheUrl => "Check the cache REST URL.",
        ErrorKind::CacheToken => "Check the cache REST token.",
        ErrorKind::Network => "The network failure persisted after retries; check connectivity and run setup again.",
        ErrorKind::Unknown => "Run setup again from the confirmation screen; completed work is skipped automatically.",
    };
    format!("{e}. {hint}")
}

/// The environment variables the product needs at runtime, derived from the
/// request plus the keys resolved during this run.
fn product_env(req: &ProvisionRequest, keys: &DatabaseKeys) -> Vec<EnvVar> {
    vec![
        EnvVar::new("DATABASE_URL", &keys.connection_string),
        EnvVar::new("DATABASE_API_URL", &keys.api_url),
        EnvVar::new("DATABASE_ANON_KEY", &keys.anon_key),
        EnvVar::new("DATABASE_SERVICE_ROLE_KEY", &keys.service_role_key),
        EnvVar::new("QUEUE_TOKEN", &req.queue.token),
        EnvVar::new("QUEUE_CURRENT_SIGNING_KEY", &req.queue.current_signing_key),
        EnvVar::new("QUEUE_NEXT_SIGNING_KEY", &req.queue.next_signing_key),
        EnvVar::new("CACHE_REST_URL", &req.cache.rest_url),
        EnvVar::new("CACHE_REST_TOKEN", &req.cache.rest_token),
        EnvVar::new("ADMIN_EMAIL", &req.admin.email),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
