use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    services::scanner::CameraError,
    state::{DeviceMode, mode::InvalidTransition},
};

/// Errors that can occur in relay service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Failures surfaced by the device controller.
///
/// Camera permission denial is the one failure meant for the user; the others
/// report calls made in the wrong mode.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The requested mode change does not apply to the current mode.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// Camera access was refused; the device stays in keeper mode.
    #[error("camera permission denied; grant access to scan a match code")]
    CameraPermissionDenied,
    /// The camera could not be opened for another reason.
    #[error("camera unavailable")]
    Camera(#[source] CameraError),
    /// No match has been paired on this device yet.
    #[error("no match to display; scan a match code first")]
    NoActiveMatch,
    /// Keeper controls were requested outside keeper mode.
    #[error("keeper controls are unavailable while in {0:?}")]
    NotKeeper(DeviceMode),
}

impl From<CameraError> for ControllerError {
    fn from(err: CameraError) -> Self {
        match err {
            CameraError::PermissionDenied => ControllerError::CameraPermissionDenied,
            other => ControllerError::Camera(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn not_found_renders_json_message() {
        let response = AppError::from(ServiceError::NotFound("match abc123".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "not found: match abc123");
    }

    #[test]
    fn camera_denial_is_its_own_variant() {
        assert!(matches!(
            ControllerError::from(CameraError::PermissionDenied),
            ControllerError::CameraPermissionDenied
        ));
        assert!(matches!(
            ControllerError::from(CameraError::Unavailable("busy".into())),
            ControllerError::Camera(_)
        ));
    }
}
