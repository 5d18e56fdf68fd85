use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

pub const PROFILE_PICTURE_UPDATED: &str = "Profile picture updated successfully";

pub type ProfilePictureResult<T> = Result<T, ProfilePictureError>;

#[derive(Debug, Error)]
pub enum ProfilePictureError {
    #[error("User not found")]
    UserNotFound,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The object was stored but no user row took the new URL, so it is now
    /// unreferenced in the bucket.
    #[error("Failed to update user profile (orphaned object {url})")]
    PersistenceFailed { url: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProfilePictureResponse {
    pub url: String,
    pub message: String,
}

impl UploadProfilePictureResponse {
    pub fn new(url: String) -> Self {
        Self {
            url,
            message: PROFILE_PICTURE_UPDATED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePictureResponse {
    pub user_id: Uuid,
    pub url: Option<String>,
}

impl From<User> for ProfilePictureResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            url: user.profile_picture_url,
        }
    }
}
