//! Client-side wizard state machine.
//!
//! Pure and synchronous: the host UI feeds it the stored credentials at
//! mount, progress events while the saga streams, and user actions. It owns
//! the one copy of the collected credentials and scrubs the sensitive
//! fields the moment provisioning succeeds. Nothing in here is ambient
//! state; the credentials travel explicitly as a [`ProvisionRequest`].

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::event::ProgressEvent;
use crate::request::{
    AdminIdentity, CacheCredentials, DatabaseCredentials, HostingCredentials, ProvisionRequest,
    QueueCredentials,
};
use crate::step::StepId;

/// Bump when the stored shape changes; a mismatch sends the user back to
/// the collection flow instead of deserializing stale fields.
pub const CREDENTIALS_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Stored credentials
// ---------------------------------------------------------------------------

/// Credentials collected screen by screen, persisted client-side so the
/// flow survives page reloads. Read once at mount, never treated as global
/// state.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub version: u32,
    pub hosting: Option<HostingCredentials>,
    pub database: Option<DatabaseCredentials>,
    pub queue: Option<QueueCredentials>,
    pub cache: Option<CacheCredentials>,
    pub admin: Option<AdminIdentity>,
}

impl StoredCredentials {
    /// Assemble a complete, validated request, or `None` if any group is
    /// missing or invalid.
    pub fn request(&self) -> Option<ProvisionRequest> {
        let req = ProvisionRequest {
            hosting: self.hosting.clone()?,
            database: self.database.clone()?,
            queue: self.queue.clone()?,
            cache: self.cache.clone()?,
            admin: self.admin.clone()?,
        };
        req.validate().ok()?;
        Some(req)
    }

    /// Overwrite every sensitive field in place. Display-only fields
    /// (project ids, the admin email) survive for the success screen.
    pub fn scrub(&mut self) {
        if let Some(h) = &mut self.hosting {
            h.access_token.clear();
        }
        if let Some(d) = &mut self.database {
            d.access_token.clear();
            d.db_password.clear();
        }
        if let Some(q) = &mut self.queue {
            q.token.clear();
            q.current_signing_key.clear();
            q.next_signing_key.clear();
        }
        if let Some(c) = &mut self.cache {
            c.rest_token.clear();
        }
        if let Some(a) = &mut self.admin {
            a.password_hash.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Loading,
    Confirm,
    Provisioning,
    Success,
    Error,
    /// A credential group is missing or stale; the host routes to the
    /// collection flow.
    RedirectToCollection,
    /// The user aborted the in-flight request. Terminal, not an error.
    Cancelled,
}

/// What the provisioning screen currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseDisplay {
    pub title: String,
    pub subtitle: String,
    pub progress: u8,
    pub retry: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDisplay {
    pub message: String,
    pub kind: ErrorKind,
    /// Credential screen to route back to, when the failure implicates one.
    pub return_to: Option<StepId>,
}

pub struct Wizard {
    state: WizardState,
    display: PhaseDisplay,
    credentials: StoredCredentials,
    error: Option<ErrorDisplay>,
}

impl Wizard {
    /// Read the stored credentials once and decide the entry state.
    pub fn mount(credentials: StoredCredentials) -> Self {
        let state = if credentials.version == CREDENTIALS_VERSION
            && credentials.request().is_some()
        {
            WizardState::Confirm
        } else {
            WizardState::RedirectToCollection
        };
        Wizard {
            state,
            display: PhaseDisplay::default(),
            credentials,
            error: None,
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn display(&self) -> &PhaseDisplay {
        &self.display
    }

    pub fn error(&self) -> Option<&ErrorDisplay> {
        self.error.as_ref()
    }

    /// The request to submit. Present only while credentials are intact.
    pub fn request(&self) -> Option<ProvisionRequest> {
        self.credentials.request()
    }

    /// User confirmed the summary screen; the host submits the request.
    pub fn confirm(&mut self) {
        if self.state == WizardState::Confirm {
            self.state = WizardState::Provisioning;
            self.error = None;
        }
    }

    /// One event from the progress stream.
    pub fn on_event(&mut self, event: &ProgressEvent) {
        if self.state != WizardState::Provisioning {
            return;
        }
        match event {
            ProgressEvent::Phase {
                title,
                subtitle,
                progress,
                ..
            } => {
                self.display.title = title.clone();
                self.display.subtitle = subtitle.clone();
                // Progress never moves backwards, whatever the stream says.
                self.display.progress = self.display.progress.max(*progress);
                self.display.retry = None;
            }
            ProgressEvent::Retry {
                retry_count,
                max_retries,
                ..
            } => {
                self.display.retry = Some((*retry_count, *max_retries));
            }
            ProgressEvent::Error { error, kind, .. } => {
                self.error = Some(ErrorDisplay {
                    message: error.clone(),
                    kind: *kind,
                    return_to: kind.return_to(),
                });
                self.state = WizardState::Error;
            }
            ProgressEvent::Complete { ok: true } => {
                self.credentials.scrub();
                self.display.progress = 100;
                self.state = WizardState::Success;
            }
            ProgressEvent::Complete { ok: false } => {
                self.error = Some(ErrorDisplay {
                    message: "Provisioning did not complete.".into(),
                    kind: ErrorKind::Unknown,
                    return_to: None,
                });
                self.state = WizardState::Error;
            }
        }
    }

    /// The stream itself failed (disconnect, malformed frame).
    pub fn on_stream_error(&mut self, message: impl Into<String>) {
        if self.state == WizardState::Provisioning {
            self.error = Some(ErrorDisplay {
                message: message.into(),
                kind: ErrorKind::Unknown,
                return_to: None,
            });
            self.state = WizardState::Error;
        }
    }

    /// The user aborted the in-flight request. A no-op terminal transition;
    /// the saga's idempotent design makes a later re-run safe.
    pub fn on_abort(&mut self) {
        if self.state == WizardState::Provisioning {
            self.state = WizardState::Cancelled;
        }
    }

    /// "Try again" — resubmit the same saga from the confirmation screen;
    /// completed work is skipped server-side.
    pub fn retry(&mut self) {
        if self.state == WizardState::Error {
            self.state = WizardState::Confirm;
            self.display = PhaseDisplay::default();
        }
    }

    /// "Start over" — back to the collection flow for fresh credentials.
    pub fn restart(&mut self) {
        if self.state == WizardState::Error {
            self.state = WizardState::RedirectToCollection;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
