use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;

use launchpad_core::{ProvisionRequest, SagaOutcome};

use super::PlatformArgs;

/// Run the full saga against the real platforms, printing each progress
/// event as one JSON line. Useful for scripted installs and for debugging
/// the wizard flow without a browser.
pub fn run(file: &Path, platforms: &PlatformArgs, migrations_dir: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading credentials file {}", file.display()))?;
    let request: ProvisionRequest =
        serde_json::from_str(&raw).context("parsing credentials file")?;
    request.validate()?;

    let coordinator = platforms.coordinator(migrations_dir);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{line}");
                }
            }
        });

        let outcome = coordinator.run(request, tx).await;
        printer.await?;

        match outcome {
            SagaOutcome::Completed => Ok(()),
            SagaOutcome::Failed {
                step,
                kind,
                message,
            } => Err(anyhow!("provisioning failed at {step} ({kind}): {message}")),
            SagaOutcome::Cancelled => Err(anyhow!("provisioning cancelled")),
        }
    })
}
