use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use uuid::Uuid;

use crate::handlers::AppError;
use crate::models::*;
use crate::services::PictureUpload;
use crate::AppState;

/// Multipart field carrying the picture
pub const FILE_FIELD: &str = "file";

/// Upload a new profile picture for a user.
///
/// The `file` field is streamed to object storage without being buffered
/// whole. Other fields are skipped.
pub async fn upload_profile_picture(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadProfilePictureResponse>, AppError> {
    tracing::info!(user_id = %user_id, "Received profile picture upload");

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            tracing::debug!("Skipping field: {:?}", field.name());
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        // Convert the field into an `AsyncRead`
        let body_with_io_error = field.map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let upload = PictureUpload {
            filename,
            content_type,
            body: StreamReader::new(Box::pin(body_with_io_error)),
        };

        let response = state
            .profile_pictures
            .upload_profile_picture(user_id, upload)
            .await?;

        return Ok(Json(response));
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}

/// Get the current profile picture of a user
pub async fn get_profile_picture(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfilePictureResponse>, AppError> {
    let response = state.profile_pictures.get_profile_picture(user_id).await?;
    Ok(Json(response))
}
