use crate::domain::models::UserId;

/// Cache of resolved primary avatar URLs.
///
/// Every invalidation moves the user to a new generation. A reader takes the
/// generation before it looks up the primary and hands it back on insert, so
/// a URL resolved before a concurrent change never outlives that change.
pub trait AvatarUrlCache: Send + Sync + 'static {
    fn get(&self, user_id: &UserId, size: u32) -> Option<String>;

    fn generation(&self, user_id: &UserId) -> u64;

    /// Store `url` unless the user was invalidated since `generation` was read.
    fn insert(&self, user_id: &UserId, size: u32, url: String, generation: u64);

    /// Drop everything cached for `user_id`. Called whenever the primary changes.
    fn invalidate(&self, user_id: &UserId);
}
