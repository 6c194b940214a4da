//! This module defines the [`ApiError`] wrapper that maps
//! [`ManagerError`]s onto HTTP statuses and wire error codes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use eots_types::api::{ErrorResponse, error_codes};

use crate::services::manager::ManagerError;

/// Error type returned by all `/v1` handlers.
#[derive(Debug)]
pub(crate) struct ApiError(ManagerError);

impl From<ManagerError> for ApiError {
    fn from(value: ManagerError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.0 {
            ManagerError::KeyAlreadyExists(_) => (
                StatusCode::CONFLICT,
                error_codes::KEY_ALREADY_EXISTS,
                self.0.to_string(),
            ),
            ManagerError::KeyNotFound => (
                StatusCode::NOT_FOUND,
                error_codes::KEY_NOT_FOUND,
                self.0.to_string(),
            ),
            ManagerError::InvalidPassphrase => (
                StatusCode::UNAUTHORIZED,
                error_codes::INVALID_PASSPHRASE,
                self.0.to_string(),
            ),
            ManagerError::RandomnessAlreadyCommitted { .. } => (
                StatusCode::CONFLICT,
                error_codes::RANDOMNESS_ALREADY_COMMITTED,
                self.0.to_string(),
            ),
            ManagerError::RandomnessNotFound { .. } => (
                StatusCode::NOT_FOUND,
                error_codes::RANDOMNESS_NOT_FOUND,
                self.0.to_string(),
            ),
            ManagerError::DoubleSign { .. } => (
                StatusCode::FORBIDDEN,
                error_codes::DOUBLE_SIGN,
                self.0.to_string(),
            ),
            ManagerError::InvalidRequest(_) => (
                StatusCode::BAD_REQUEST,
                error_codes::INVALID_REQUEST,
                self.0.to_string(),
            ),
            // Storage and internal failures never leak their details to
            // callers.
            ManagerError::Storage(err) => {
                tracing::error!("storage error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL,
                    "internal error".to_string(),
                )
            }
            ManagerError::Internal(err) => {
                tracing::error!("internal error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { code, message })).into_response()
    }
}
