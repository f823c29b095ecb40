//! Generic readiness polling: check a predicate until it holds or a
//! deadline elapses. Used for the remote-status waits (database project
//! active, deployment ready); the deadline produces a typed error, never a
//! panic, and the caller treats it as fatal.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{ProvisionError, Result};

/// Poll `probe` every `interval` until it returns `Ok(true)` or `timeout`
/// elapses. `on_tick(elapsed)` runs on every iteration so the caller can
/// keep its progress display fresh during long waits. A probe error aborts
/// the wait immediately.
pub async fn wait_until_ready<F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut on_tick: impl FnMut(Duration),
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let started = Instant::now();
    loop {
        let elapsed = started.elapsed();
        on_tick(elapsed);
        if probe().await? {
            return Ok(());
        }
        if started.elapsed() + interval > timeout {
            return Err(ProvisionError::Timeout {
                what: what.to_string(),
                secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(interval).await;
    }
}
