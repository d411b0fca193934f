//! API error types and conversions
//!
//! Devices only ever see a status line. Bodies stay empty so no paths or
//! catalog details leak; the detail goes to the request log instead.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use espota_core::UpdateError;
use hyper::ext::ReasonPhrase;

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// 403 Forbidden
    Forbidden(String),
    /// 500 with a custom reason phrase
    ResolutionFailed {
        message: String,
        reason: &'static str,
    },
    /// 500 Internal Server Error
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::ResolutionFailed { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_type, message, reason) = match self {
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::ResolutionFailed { message, reason } => {
                ("resolution_failed", message, Some(reason))
            }
            ApiError::Internal(msg) => ("internal_error", msg, None),
        };

        // Log errors at appropriate levels
        if status.is_server_error() {
            tracing::error!(error = error_type, %message, "API error");
        } else if status.is_client_error() {
            tracing::debug!(error = error_type, %message, "API client error");
        }

        let mut response = Response::new(Body::empty());
        *response.status_mut() = status;
        if let Some(reason) = reason {
            response
                .extensions_mut()
                .insert(ReasonPhrase::from_static(reason.as_bytes()));
        }
        response
    }
}

impl From<UpdateError> for ApiError {
    fn from(err: UpdateError) -> Self {
        let message = err.to_string();
        match err.reason_phrase() {
            Some(reason) => ApiError::ResolutionFailed { message, reason },
            None => ApiError::Forbidden(message),
        }
    }
}
