use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::ProfilePictureError;
use crate::storage::StorageError;

#[derive(Debug)]
pub enum AppError {
    ProfilePicture(ProfilePictureError),
    Multipart(MultipartError),
    BadRequest(String),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Multipart(err)
    }
}

impl From<ProfilePictureError> for AppError {
    fn from(err: ProfilePictureError) -> Self {
        AppError::ProfilePicture(err)
    }
}

impl AppError {
    fn status_and_detail(self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Multipart(err) => multipart_failure(&err),
            AppError::ProfilePicture(ProfilePictureError::UserNotFound) => {
                (StatusCode::NOT_FOUND, "User not found".to_string())
            }
            AppError::ProfilePicture(ProfilePictureError::PersistenceFailed { url }) => {
                tracing::error!(url = %url, "Profile picture URL was not persisted");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to update user profile".to_string(),
                )
            }
            // The client body failed mid-upload, e.g. hit the size limit
            AppError::ProfilePicture(ProfilePictureError::Storage(StorageError::Read(err))) => {
                match err
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<MultipartError>())
                {
                    Some(multipart) => multipart_failure(multipart),
                    None => {
                        tracing::warn!("Failed to read uploaded file: {}", err);
                        (
                            StatusCode::BAD_REQUEST,
                            "Failed to read uploaded file".to_string(),
                        )
                    }
                }
            }
            AppError::ProfilePicture(err) => {
                tracing::error!("Profile picture upload failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

/// Status for a multipart parse or read failure, as reported by axum.
fn multipart_failure(err: &MultipartError) -> (StatusCode, String) {
    let status = err.status();
    tracing::warn!(status = %status, "Multipart request failed: {}", err.body_text());

    let detail = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "File too large".to_string()
    } else if status.is_server_error() {
        "Internal server error".to_string()
    } else {
        format!("Invalid multipart: {}", err.body_text())
    };

    (status, detail)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
