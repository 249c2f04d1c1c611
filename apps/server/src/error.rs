use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::borrow::Cow;
use tracing::{error, warn};
use veil_core::VeilError;

const VERIFICATION_FAILED: &str = "Stored data failed verification";

/// Error body returned by every failing route.
#[veil_derive::api_model]
pub struct ErrorResponse {
    /// Stable error kind, e.g. `InvalidInput`
    pub error: String,
    pub message: String,
}

#[veil_derive::veil_error]
pub enum ApiError {
    #[error("{source}")]
    Veil { source: VeilError, context: Option<Cow<'static, str>> },

    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("{message}")]
    BadRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ApiError {
    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    pub(crate) fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest { message: message.into(), context: None }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Veil { source, .. } => match source {
                VeilError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                VeilError::NotFound { .. } => StatusCode::NOT_FOUND,
                VeilError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
                VeilError::Store { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Veil { source, .. } if source.is_security_violation() => {
                // The dispatcher already logged the details.
                ErrorResponse { error: source.kind().to_owned(), message: VERIFICATION_FAILED.to_owned() }
            },
            Self::Veil { source, .. } => {
                if status.is_server_error() {
                    error!(kind = source.kind(), error = %source, "Request failed");
                }
                ErrorResponse { error: source.kind().to_owned(), message: source.to_string() }
            },
            other => {
                warn!(error = %other, "Request rejected");
                ErrorResponse { error: other.kind().to_owned(), message: other.to_string() }
            },
        };
        (status, Json(body)).into_response()
    }
}
