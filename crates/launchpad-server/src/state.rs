use std::sync::Arc;
use std::time::Duration;

use launchpad_core::Coordinator;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    /// Server-side ceiling on one saga run. Long enough for the readiness
    /// waits, short enough that an abandoned run cannot hold the request
    /// open forever.
    pub saga_budget: Duration,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        AppState {
            coordinator,
            saga_budget: Duration::from_secs(300),
        }
    }

    pub fn with_saga_budget(mut self, budget: Duration) -> Self {
        self.saga_budget = budget;
        self
    }
}
