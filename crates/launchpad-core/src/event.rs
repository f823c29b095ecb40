//! Typed progress events emitted by the saga coordinator.
//!
//! The coordinator is the single producer; the transport (SSE framing in the
//! server, stdout in the CLI) is a dumb forwarder. Events serialize to the
//! exact wire shape the wizard consumes, one JSON object per `data:` line.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::step::StepId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// A new step started.
    Phase {
        phase: StepId,
        title: String,
        subtitle: String,
        progress: u8,
    },
    /// A step is being re-attempted after a retryable failure.
    Retry {
        #[serde(rename = "stepId")]
        step_id: StepId,
        #[serde(rename = "retryCount")]
        retry_count: u32,
        #[serde(rename = "maxRetries")]
        max_retries: u32,
    },
    /// Fatal: the saga stopped at `step_id`. `kind` tells the wizard which
    /// credential screen to route the user back to. `step_id` is absent only
    /// for failures that happen outside any step (e.g. the server-side
    /// execution budget elapsing).
    Error {
        error: String,
        kind: ErrorKind,
        #[serde(rename = "stepId", skip_serializing_if = "Option::is_none", default)]
        step_id: Option<StepId>,
    },
    /// Terminal success marker.
    Complete { ok: bool },
}

impl ProgressEvent {
    pub fn phase(step: StepId) -> Self {
        ProgressEvent::Phase {
            phase: step,
            title: step.title().to_string(),
            subtitle: step.subtitle().to_string(),
            progress: step.progress(),
        }
    }

    pub fn retry(step: StepId, retry_count: u32, max_retries: u32) -> Self {
        ProgressEvent::Retry {
            step_id: step,
            retry_count,
            max_retries,
        }
    }
}
