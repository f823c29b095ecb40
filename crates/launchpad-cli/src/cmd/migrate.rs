use std::path::Path;

use anyhow::Result;

use launchpad_core::migrate::{MigrateEvent, Migrator};

/// Apply pending migrations straight to a database, outside the saga, or
/// list the ledger with `--status`.
pub fn run(
    database_url: &str,
    migrations_dir: &Path,
    no_storage_wait: bool,
    status: bool,
) -> Result<()> {
    let mut migrator = Migrator::new(migrations_dir);
    if no_storage_wait || status {
        migrator = migrator.storage_wait(None);
    }

    let rt = tokio::runtime::Runtime::new()?;

    if status {
        let entries = rt.block_on(async { migrator.ledger(database_url).await })?;
        if entries.is_empty() {
            println!("no migrations applied yet");
        }
        for entry in entries {
            println!("{}  {}", entry.applied_at.to_rfc3339(), entry.name);
        }
        return Ok(());
    }

    let progress = |event: MigrateEvent| match event {
        MigrateEvent::Applying { file } => println!("applying {file}"),
        MigrateEvent::Applied { file } => println!("applied  {file}"),
        MigrateEvent::AlreadyPresent { file } => {
            println!("recorded {file} (objects already present)")
        }
        MigrateEvent::ConnectRetry {
            attempt,
            max_attempts,
        } => eprintln!("connect failed (attempt {attempt}/{max_attempts}), retrying"),
        MigrateEvent::WaitingForStorage { elapsed } => {
            println!("waiting for storage schema ({}s)", elapsed.as_secs())
        }
    };

    let applied = rt.block_on(async { migrator.apply(database_url, &progress).await })?;
    println!("{applied} migration(s) applied");
    Ok(())
}
