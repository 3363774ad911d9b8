use crate::domain::models::AvatarUpdated;

/// Receiver of "avatar updated" notifications.
///
/// Publishing is synchronous and must not fail the operation that triggered it.
pub trait AvatarEventSink: Send + Sync + 'static {
    fn publish(&self, event: AvatarUpdated);
}
