use async_trait::async_trait;

use crate::domain::{
    models::{StoredImage, UserId},
    AvatarError,
};

/// Blob storage holding the uploaded images and their pre-rendered sizes.
#[async_trait]
pub trait AvatarStorage: Send + Sync + 'static {
    /// Store `bytes` under a name derived from `file_name` and the owner.
    async fn save(
        &self,
        user_id: &UserId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, AvatarError>;

    /// URL of the artifact rendered at `size`, if one has been generated.
    async fn url_for(
        &self,
        image: &StoredImage,
        size: u32,
    ) -> Result<Option<String>, AvatarError>;

    /// Remove the image together with its rendered artifacts.
    async fn remove(&self, image: &StoredImage) -> Result<(), AvatarError>;
}
