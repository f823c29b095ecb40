//! Typed clients for the four external platforms the saga coordinates.
//!
//! Each client wraps one opaque HTTP API behind the matching trait from
//! `launchpad_core::platform`. Construction takes the API base URL so tests
//! can point a client at a local mock server. Every call builds a fresh
//! request; nothing is shared between attempts beyond reqwest's own
//! connection pool.

pub mod cache;
pub mod database;
pub mod hosting;
pub mod queue;

pub use cache::CacheClient;
pub use database::DatabaseClient;
pub use hosting::HostingClient;
pub use queue::QueueClient;

use launchpad_core::error::ProvisionError;
use launchpad_core::platform::Platform;

/// How long any single platform call may take before it counts as a
/// (retryable) network failure.
pub(crate) const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Transport-level failures (DNS, connect, reset, timeout) are the
/// retryable class; everything that produced a status code is not.
pub(crate) fn transport_error(platform: Platform, e: reqwest::Error) -> ProvisionError {
    ProvisionError::Network {
        platform,
        message: e.to_string(),
    }
}

/// Map a non-success response to the taxonomy: 401/403 implicate the
/// credential, anything else is surfaced with its body for diagnostics.
pub(crate) async fn status_error(platform: Platform, resp: reqwest::Response) -> ProvisionError {
    let status = resp.status().as_u16();
    if status == 401 || status == 403 {
        return ProvisionError::Unauthorized { platform, status };
    }
    let body = resp.text().await.unwrap_or_default();
    let body = body.chars().take(200).collect::<String>();
    ProvisionError::UnexpectedStatus {
        platform,
        status,
        body,
    }
}
