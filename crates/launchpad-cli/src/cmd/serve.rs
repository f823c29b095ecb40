use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use launchpad_server::state::AppState;

use super::PlatformArgs;

pub fn run(port: u16, platforms: &PlatformArgs, migrations_dir: &Path) -> Result<()> {
    let coordinator = Arc::new(platforms.coordinator(migrations_dir));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        launchpad_server::serve(AppState::new(coordinator), port).await
    })
}
