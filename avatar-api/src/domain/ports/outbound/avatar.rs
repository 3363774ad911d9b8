use async_trait::async_trait;

use crate::domain::{
    models::{Avatar, AvatarId, NewAvatar, UserId, UserKey},
    AvatarError,
};

/// Persistent store for avatar records.
///
/// Every mutating call is scoped by owner, and the multi-row updates
/// (`insert_primary`, `set_primary`) must run atomically so readers never
/// observe zero or two primaries for a user.
#[async_trait]
pub trait AvatarRepository: Send + Sync + 'static {
    /// All avatars of `user_id` in natural order (`date_uploaded`, then `id`).
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Avatar>, AvatarError>;

    async fn primary_for_user(&self, user_id: &UserId) -> Result<Option<Avatar>, AvatarError>;

    /// Insert `avatar` flagged primary, clearing any previous primary.
    async fn insert_primary(&self, avatar: &NewAvatar) -> Result<Avatar, AvatarError>;

    /// Flag `avatar_id` as primary and clear the flag everywhere else.
    async fn set_primary(
        &self,
        user_id: &UserId,
        avatar_id: &AvatarId,
    ) -> Result<Avatar, AvatarError>;

    /// Remove the given avatars of `user_id`, returning the removed rows.
    ///
    /// Unknown ids are ignored.
    async fn delete_many(
        &self,
        user_id: &UserId,
        avatar_ids: &[AvatarId],
    ) -> Result<Vec<Avatar>, AvatarError>;

    async fn find_user_by_key(&self, key: &UserKey) -> Result<Option<UserId>, AvatarError>;
}
