use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::domain::{models::UserId, ports::outbound::AvatarUrlCache};

/// In-memory cache of primary avatar URLs keyed by user and size.
#[derive(Clone)]
pub struct MokaAvatarUrlCache {
    cache: Cache<(UserId, u32), String>,
    generations: Cache<UserId, u64>,
    clock: Arc<AtomicU64>,
}

impl MokaAvatarUrlCache {
    pub fn new(max_capacity: u64, time_to_live: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(time_to_live)
            .support_invalidation_closures()
            .build();

        // Generations must live at least as long as the URLs they guard.
        let generations = Cache::builder().max_capacity(max_capacity).build();

        Self {
            cache,
            generations,
            clock: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl AvatarUrlCache for MokaAvatarUrlCache {
    fn get(&self, user_id: &UserId, size: u32) -> Option<String> {
        self.cache.get(&(*user_id, size))
    }

    fn generation(&self, user_id: &UserId) -> u64 {
        self.generations.get(user_id).unwrap_or(0)
    }

    fn insert(&self, user_id: &UserId, size: u32, url: String, generation: u64) {
        if self.generation(user_id) != generation {
            return;
        }

        self.cache.insert((*user_id, size), url);

        // An invalidation may have landed between the check and the insert.
        if self.generation(user_id) != generation {
            self.cache.invalidate(&(*user_id, size));
        }
    }

    fn invalidate(&self, user_id: &UserId) {
        let user_id = *user_id;
        let next = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        self.generations.insert(user_id, next);

        if let Err(err) = self
            .cache
            .invalidate_entries_if(move |(cached, _), _| *cached == user_id)
        {
            tracing::error!("Failed to invalidate avatar cache for user {}: {}", user_id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> MokaAvatarUrlCache {
        MokaAvatarUrlCache::new(100, Duration::from_secs(60))
    }

    #[test]
    fn invalidate_only_drops_that_user() {
        let cache = cache();
        let alice = UserId::new(1);
        let bob = UserId::new(2);
        cache.insert(&alice, 80, "/a/80".to_string(), cache.generation(&alice));
        cache.insert(&alice, 40, "/a/40".to_string(), cache.generation(&alice));
        cache.insert(&bob, 80, "/b/80".to_string(), cache.generation(&bob));

        cache.invalidate(&alice);

        assert_eq!(cache.get(&alice, 80), None);
        assert_eq!(cache.get(&alice, 40), None);
        assert_eq!(cache.get(&bob, 80).as_deref(), Some("/b/80"));
    }

    #[test]
    fn url_read_before_invalidation_is_not_stored() {
        let cache = cache();
        let alice = UserId::new(1);
        let seen = cache.generation(&alice);

        cache.invalidate(&alice);
        cache.insert(&alice, 80, "/old/80".to_string(), seen);

        assert_eq!(cache.get(&alice, 80), None);

        let current = cache.generation(&alice);
        assert_ne!(current, seen);
        cache.insert(&alice, 80, "/new/80".to_string(), current);
        assert_eq!(cache.get(&alice, 80).as_deref(), Some("/new/80"));
    }
}
