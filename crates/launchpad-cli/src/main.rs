mod cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cmd::PlatformArgs;

#[derive(Parser)]
#[command(
    name = "launchpad",
    about = "First-run provisioning — verify credentials, migrate the database, deploy the instance",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the setup wizard's HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "3141")]
        port: u16,

        #[command(flatten)]
        platforms: PlatformArgs,

        /// Directory of ordered schema migration files
        #[arg(long, env = "LAUNCHPAD_MIGRATIONS_DIR", default_value = "migrations")]
        migrations_dir: PathBuf,
    },

    /// Run the provisioning saga locally, printing one JSON event per line
    Provision {
        /// JSON file matching the provisioning request body
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        platforms: PlatformArgs,

        /// Directory of ordered schema migration files
        #[arg(long, env = "LAUNCHPAD_MIGRATIONS_DIR", default_value = "migrations")]
        migrations_dir: PathBuf,
    },

    /// Apply pending schema migrations directly (operations escape hatch)
    Migrate {
        /// Postgres connection string for the target database
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Directory of ordered schema migration files
        #[arg(long, env = "LAUNCHPAD_MIGRATIONS_DIR", default_value = "migrations")]
        migrations_dir: PathBuf,

        /// Skip waiting for the managed platform's storage schema
        /// (local or self-hosted databases)
        #[arg(long)]
        no_storage_wait: bool,

        /// List the ledger instead of applying anything
        #[arg(long)]
        status: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Serve {
            port,
            platforms,
            migrations_dir,
        } => cmd::serve::run(port, &platforms, &migrations_dir),
        Commands::Provision {
            file,
            platforms,
            migrations_dir,
        } => cmd::provision::run(&file, &platforms, &migrations_dir),
        Commands::Migrate {
            database_url,
            migrations_dir,
            no_storage_wait,
            status,
        } => cmd::migrate::run(&database_url, &migrations_dir, no_storage_wait, status),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
