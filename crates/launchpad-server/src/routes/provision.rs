use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt as _;
use tracing::{error, info, warn};

use launchpad_core::{ErrorKind, ProgressEvent, ProvisionRequest, SagaOutcome};

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/provision — run the full provisioning saga, streaming one
/// `data:`-framed JSON event per transition.
///
/// The response ends when the saga reaches a terminal state. Requests that
/// fail validation never start streaming; they return a plain 400.
pub async fn provision(
    State(app): State<AppState>,
    Json(request): Json<ProvisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    info!(request = ?request, "provisioning requested");

    let (tx, rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let coordinator = app.coordinator.clone();
    let budget = app.saga_budget;

    tokio::spawn(async move {
        // Keep one sender for the budget-exceeded path; `run` owns the other.
        let overrun_tx = tx.clone();
        match tokio::time::timeout(budget, coordinator.run(request, tx)).await {
            Ok(SagaOutcome::Completed) => info!("saga completed"),
            Ok(SagaOutcome::Cancelled) => info!("saga cancelled by the client"),
            Ok(SagaOutcome::Failed { step, kind, message }) => {
                warn!(step = %step, kind = %kind, message = %message, "saga failed");
            }
            Err(_elapsed) => {
                error!(budget_secs = budget.as_secs(), "saga exceeded its execution budget");
                let _ = overrun_tx.send(ProgressEvent::Error {
                    error: format!(
                        "Provisioning did not finish within {}s. Run setup again; \
                         completed work is skipped automatically.",
                        budget.as_secs()
                    ),
                    kind: ErrorKind::Unknown,
                    step_id: None,
                });
            }
        }
    });

    // The coordinator is the single producer; this stream is a dumb
    // forwarder that never buffers more than one event behind real time.
    let stream = UnboundedReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| {
            r#"{"type":"error","error":"event encoding failed","kind":"unknown"}"#.to_string()
        });
        Ok::<Event, Infallible>(Event::default().data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
