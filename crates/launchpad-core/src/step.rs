//! The fixed provisioning pipeline.
//!
//! Steps form a statically ordered list, not a DAG: later steps consume
//! values (API keys, the connection string) resolved by earlier ones, so
//! there is nothing to parallelize. Each step carries the display strings
//! the wizard renders and the retry policy the coordinator applies to it.

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// One named unit of work in the provisioning saga, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    VerifyHosting,
    EnsureDatabaseProject,
    WaitDatabaseActive,
    ResolveDatabaseKeys,
    VerifyQueue,
    VerifyCache,
    ConfigureHostingEnv,
    RunMigrations,
    BootstrapAdmin,
    TriggerRedeploy,
    WaitDeploymentReady,
}

impl StepId {
    /// Every step, in execution order.
    pub const ALL: [StepId; 11] = [
        StepId::VerifyHosting,
        StepId::EnsureDatabaseProject,
        StepId::WaitDatabaseActive,
        StepId::ResolveDatabaseKeys,
        StepId::VerifyQueue,
        StepId::VerifyCache,
        StepId::ConfigureHostingEnv,
        StepId::RunMigrations,
        StepId::BootstrapAdmin,
        StepId::TriggerRedeploy,
        StepId::WaitDeploymentReady,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Zero-based position in the pipeline.
    pub fn ordinal(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .expect("StepId::ALL covers every variant")
    }

    /// Progress estimate shown while this step is running (0-100,
    /// monotonically non-decreasing across the pipeline).
    pub fn progress(self) -> u8 {
        ((self.ordinal() * 100) / Self::COUNT) as u8
    }

    /// Stable wire identifier, also used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::VerifyHosting => "verify_hosting",
            StepId::EnsureDatabaseProject => "ensure_database_project",
            StepId::WaitDatabaseActive => "wait_database_active",
            StepId::ResolveDatabaseKeys => "resolve_database_keys",
            StepId::VerifyQueue => "verify_queue",
            StepId::VerifyCache => "verify_cache",
            StepId::ConfigureHostingEnv => "configure_hosting_env",
            StepId::RunMigrations => "run_migrations",
            StepId::BootstrapAdmin => "bootstrap_admin",
            StepId::TriggerRedeploy => "trigger_redeploy",
            StepId::WaitDeploymentReady => "wait_deployment_ready",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StepId::VerifyHosting => "Checking hosting access",
            StepId::EnsureDatabaseProject => "Setting up the database project",
            StepId::WaitDatabaseActive => "Waiting for the database",
            StepId::ResolveDatabaseKeys => "Collecting database keys",
            StepId::VerifyQueue => "Checking the job queue",
            StepId::VerifyCache => "Checking the cache",
            StepId::ConfigureHostingEnv => "Configuring the deployment",
            StepId::RunMigrations => "Preparing the database schema",
            StepId::BootstrapAdmin => "Creating your admin account",
            StepId::TriggerRedeploy => "Deploying your instance",
            StepId::WaitDeploymentReady => "Waiting for the deployment",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            StepId::VerifyHosting => "Verifying the hosting token and project",
            StepId::EnsureDatabaseProject => "Reusing the project if it already exists",
            StepId::WaitDatabaseActive => "New projects can take a couple of minutes",
            StepId::ResolveDatabaseKeys => "Fetching API keys and the connection string",
            StepId::VerifyQueue => "Verifying the queue token",
            StepId::VerifyCache => "Verifying the cache URL and token",
            StepId::ConfigureHostingEnv => "Writing environment variables",
            StepId::RunMigrations => "Applying pending schema migrations",
            StepId::BootstrapAdmin => "Registering the administrator",
            StepId::TriggerRedeploy => "Starting a fresh build",
            StepId::WaitDeploymentReady => "Builds usually finish within a few minutes",
        }
    }

    /// Retry policy the coordinator applies to this step.
    ///
    /// The readiness waits and the migration step run a single attempt: the
    /// waits already bound their own polling, and the Migrator owns its own
    /// connect retry loop (a second outer loop would multiply attempts).
    pub fn retry_policy(self) -> RetryPolicy {
        match self {
            StepId::WaitDatabaseActive
            | StepId::WaitDeploymentReady
            | StepId::RunMigrations => RetryPolicy::none(),
            _ => RetryPolicy::default(),
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_pipeline_order() {
        for (i, step) in StepId::ALL.iter().enumerate() {
            assert_eq!(step.ordinal(), i);
        }
    }

    #[test]
    fn progress_is_monotonically_non_decreasing() {
        let mut last = 0u8;
        for step in StepId::ALL {
            assert!(step.progress() >= last, "{step} regressed progress");
            last = step.progress();
        }
        assert!(last < 100, "100 is reserved for completion");
    }

    #[test]
    fn wire_id_round_trips_through_serde() {
        for step in StepId::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
            let back: StepId = serde_json::from_str(&json).unwrap();
            assert_eq!(back, step);
        }
    }

    #[test]
    fn waits_and_migrations_do_not_retry_at_the_step_level() {
        assert_eq!(StepId::WaitDatabaseActive.retry_policy().max_attempts, 1);
        assert_eq!(StepId::WaitDeploymentReady.retry_policy().max_attempts, 1);
        assert_eq!(StepId::RunMigrations.retry_policy().max_attempts, 1);
        assert!(StepId::VerifyHosting.retry_policy().max_attempts > 1);
    }
}
