mod bootstrap;
pub mod error;
pub mod event;
pub mod migrate;
pub mod platform;
pub mod poll;
pub mod request;
pub mod retry;
pub mod saga;
pub mod step;
pub mod wizard;

pub use error::{ErrorKind, ProvisionError, Result};
pub use event::ProgressEvent;
pub use request::ProvisionRequest;
pub use saga::{Coordinator, SagaConfig, SagaOutcome};
pub use step::StepId;
