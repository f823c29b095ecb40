use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use launchpad_core::ProvisionError;

/// Unified error type for HTTP responses.
///
/// Only failures that happen before the event stream starts surface this
/// way (malformed body, invalid request fields); once the saga is running,
/// every failure travels as a wire `error` event instead.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(ProvisionError::InvalidRequest(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<ProvisionError>() {
            match e {
                ProvisionError::InvalidRequest(_) | ProvisionError::InvalidCacheUrl(_) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
