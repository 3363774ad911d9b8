use async_trait::async_trait;

use crate::domain::{
    models::{Avatar, AvatarDirectory, AvatarId, AvatarUpload, UserId, UserKey},
    AvatarError,
};

/// The avatar directory of a user: one primary out of a bounded, ordered set.
#[async_trait]
pub trait AvatarService: Send + Sync + 'static {
    /// Map the identity provider's user key onto a known user.
    async fn identify(&self, key: &UserKey) -> Result<Option<UserId>, AvatarError>;

    /// Current primary plus the visible avatar set. Read-only.
    async fn resolve(&self, user_id: &UserId) -> Result<AvatarDirectory, AvatarError>;

    /// Store a new upload and make it the primary avatar.
    async fn add(&self, user_id: &UserId, upload: AvatarUpload) -> Result<Avatar, AvatarError>;

    /// Make one of the user's own avatars primary.
    async fn set_primary(
        &self,
        user_id: &UserId,
        avatar_id: AvatarId,
    ) -> Result<Avatar, AvatarError>;

    /// Delete avatars, handing the primary flag to a survivor when needed.
    async fn delete(&self, user_id: &UserId, avatar_ids: &[AvatarId]) -> Result<(), AvatarError>;

    /// URL of the user's primary avatar rendered at `size`, or the default avatar URL.
    async fn primary_avatar_url(&self, key: &UserKey, size: u32) -> Result<String, AvatarError>;

    /// Size used when a caller does not ask for one.
    fn default_size(&self) -> u32;
}
