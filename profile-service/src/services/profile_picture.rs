use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::UserRepository;
use crate::models::*;
use crate::storage::ObjectStoreClient;

/// An incoming picture: the client's filename and content type plus the
/// unread body.
pub struct PictureUpload<R> {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub body: R,
}

pub struct ProfilePictureService {
    users: Arc<dyn UserRepository>,
    storage: Arc<ObjectStoreClient>,
}

impl ProfilePictureService {
    pub fn new(users: Arc<dyn UserRepository>, storage: Arc<ObjectStoreClient>) -> Self {
        Self { users, storage }
    }

    /// Store a new profile picture and point the user's record at it.
    ///
    /// The user must exist before anything is uploaded. If the record cannot
    /// be updated afterwards the stored object is left in place.
    pub async fn upload_profile_picture<R>(
        &self,
        user_id: Uuid,
        upload: PictureUpload<R>,
    ) -> ProfilePictureResult<UploadProfilePictureResponse>
    where
        R: AsyncRead + Unpin + Send,
    {
        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(ProfilePictureError::UserNotFound);
        }

        let url = self
            .storage
            .upload(
                upload.body,
                upload.filename.as_deref(),
                upload.content_type,
                None,
            )
            .await?;

        match self.users.update_profile_picture_url(user_id, &url).await? {
            Some(_) => {
                info!(user_id = %user_id, url = %url, "Profile picture updated");
                Ok(UploadProfilePictureResponse::new(url))
            }
            None => {
                warn!(
                    user_id = %user_id,
                    url = %url,
                    "User row not updated after upload, stored object is orphaned"
                );
                Err(ProfilePictureError::PersistenceFailed { url })
            }
        }
    }

    /// Get the current profile picture URL of a user
    pub async fn get_profile_picture(
        &self,
        user_id: Uuid,
    ) -> ProfilePictureResult<ProfilePictureResponse> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(ProfilePictureError::UserNotFound)?;

        Ok(user.into())
    }
}
