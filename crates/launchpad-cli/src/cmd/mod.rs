pub mod migrate;
pub mod provision;
pub mod serve;

use std::path::Path;
use std::sync::Arc;

use clap::Args;

use launchpad_core::migrate::Migrator;
use launchpad_core::Coordinator;
use launchpad_platforms::{CacheClient, DatabaseClient, HostingClient, QueueClient};

/// API endpoints for the platforms the saga coordinates. The cache
/// platform's URL arrives inside the provisioning request itself.
#[derive(Args, Debug)]
pub struct PlatformArgs {
    /// Hosting platform API base URL
    #[arg(long, env = "LAUNCHPAD_HOSTING_API")]
    pub hosting_api: String,

    /// Managed-database platform API base URL
    #[arg(long, env = "LAUNCHPAD_DATABASE_API")]
    pub database_api: String,

    /// Domain the database platform hosts project databases under
    #[arg(long, env = "LAUNCHPAD_DATABASE_DOMAIN")]
    pub database_domain: String,

    /// Job-queue platform API base URL
    #[arg(long, env = "LAUNCHPAD_QUEUE_API")]
    pub queue_api: String,
}

impl PlatformArgs {
    /// Wire the real HTTP clients and the migrator into a coordinator.
    pub fn coordinator(&self, migrations_dir: &Path) -> Coordinator {
        Coordinator::new(
            Arc::new(HostingClient::new(self.hosting_api.as_str())),
            Arc::new(DatabaseClient::new(
                self.database_api.as_str(),
                self.database_domain.as_str(),
            )),
            Arc::new(QueueClient::new(self.queue_api.as_str())),
            Arc::new(CacheClient::new()),
            Arc::new(Migrator::new(migrations_dir)),
        )
    }
}
