//! In-memory implementations of the outbound avatar ports for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use crate::domain::{
    models::{Avatar, AvatarId, AvatarUpdated, NewAvatar, StoredImage, UserId, UserKey},
    ports::outbound::{AvatarEventSink, AvatarRepository, AvatarStorage, AvatarUrlCache},
    AvatarError,
};

#[derive(Default)]
struct MockStore {
    users: HashMap<String, UserId>,
    avatars: Vec<Avatar>,
    next_id: i32,
    fail_inserts: bool,
    fail_deletes: bool,
}

/// Mock avatar repository backed by an in-memory Vec kept in insertion order.
#[derive(Clone, Default)]
pub struct MockAvatarRepository {
    store: Arc<RwLock<MockStore>>,
}

impl MockAvatarRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user reachable through `find_user_by_key`.
    pub fn with_user(self, key: &str, user_id: UserId) -> Self {
        self.store
            .write()
            .unwrap()
            .users
            .insert(key.to_string(), user_id);
        self
    }

    /// Make every subsequent `insert_primary` fail with a storage error.
    pub fn failing_inserts(self) -> Self {
        self.store.write().unwrap().fail_inserts = true;
        self
    }

    /// Make every subsequent `delete_many` fail with a storage error.
    pub fn failing_deletes(self) -> Self {
        self.store.write().unwrap().fail_deletes = true;
        self
    }

    /// Drop the primary flag from all of a user's avatars.
    pub fn clear_primary(&self, user_id: UserId) {
        for avatar in self
            .store
            .write()
            .unwrap()
            .avatars
            .iter_mut()
            .filter(|a| a.user_id == user_id)
        {
            avatar.primary = false;
        }
    }

    /// All stored avatars of a user (for test assertions).
    pub fn avatars_of(&self, user_id: UserId) -> Vec<Avatar> {
        self.store
            .read()
            .unwrap()
            .avatars
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn primary_count(&self, user_id: UserId) -> usize {
        self.avatars_of(user_id).iter().filter(|a| a.primary).count()
    }
}

#[async_trait]
impl AvatarRepository for MockAvatarRepository {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Avatar>, AvatarError> {
        Ok(self.avatars_of(*user_id))
    }

    async fn primary_for_user(&self, user_id: &UserId) -> Result<Option<Avatar>, AvatarError> {
        // Same contract as the SQL query: flagged row first, else the oldest.
        let avatars = self.avatars_of(*user_id);
        let primary = avatars.iter().find(|avatar| avatar.primary).cloned();
        Ok(primary.or_else(|| avatars.into_iter().next()))
    }

    async fn insert_primary(&self, avatar: &NewAvatar) -> Result<Avatar, AvatarError> {
        let mut store = self.store.write().unwrap();
        if store.fail_inserts {
            return Err(AvatarError::storage("insert rejected"));
        }
        for existing in store
            .avatars
            .iter_mut()
            .filter(|a| a.user_id == avatar.user_id)
        {
            existing.primary = false;
        }

        store.next_id += 1;
        let created = Avatar {
            id: AvatarId::new(store.next_id),
            user_id: avatar.user_id,
            image: avatar.image.clone(),
            primary: true,
            date_uploaded: avatar.date_uploaded,
        };
        store.avatars.push(created.clone());
        Ok(created)
    }

    async fn set_primary(
        &self,
        user_id: &UserId,
        avatar_id: &AvatarId,
    ) -> Result<Avatar, AvatarError> {
        let mut store = self.store.write().unwrap();
        if !store
            .avatars
            .iter()
            .any(|a| a.user_id == *user_id && a.id == *avatar_id)
        {
            return Err(AvatarError::NotFound);
        }

        let mut updated = None;
        for avatar in store.avatars.iter_mut().filter(|a| a.user_id == *user_id) {
            avatar.primary = avatar.id == *avatar_id;
            if avatar.primary {
                updated = Some(avatar.clone());
            }
        }
        updated.ok_or(AvatarError::NotFound)
    }

    async fn delete_many(
        &self,
        user_id: &UserId,
        avatar_ids: &[AvatarId],
    ) -> Result<Vec<Avatar>, AvatarError> {
        let doomed: HashSet<_> = avatar_ids.iter().copied().collect();
        let mut store = self.store.write().unwrap();
        if store.fail_deletes {
            return Err(AvatarError::storage("delete rejected"));
        }
        let (removed, kept): (Vec<_>, Vec<_>) = store
            .avatars
            .drain(..)
            .partition(|a| a.user_id == *user_id && doomed.contains(&a.id));
        store.avatars = kept;
        Ok(removed)
    }

    async fn find_user_by_key(&self, key: &UserKey) -> Result<Option<UserId>, AvatarError> {
        Ok(self.store.read().unwrap().users.get(key.as_str()).copied())
    }
}

/// Mock blob storage. Images are kept in a set, rendered sizes in another.
#[derive(Clone, Default)]
pub struct MockAvatarStorage {
    images: Arc<RwLock<HashSet<String>>>,
    rendered: Arc<RwLock<HashSet<(String, u32)>>>,
    fail_writes: Arc<RwLock<bool>>,
}

impl MockAvatarStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail with a storage error.
    pub fn failing(self) -> Self {
        *self.fail_writes.write().unwrap() = true;
        self
    }

    /// Pretend an artifact of `size` was rendered for `image`.
    pub fn render(&self, image: &StoredImage, size: u32) {
        self.rendered
            .write()
            .unwrap()
            .insert((image.as_str().to_string(), size));
    }

    pub fn len(&self) -> usize {
        self.images.read().unwrap().len()
    }
}

#[async_trait]
impl AvatarStorage for MockAvatarStorage {
    async fn save(
        &self,
        user_id: &UserId,
        file_name: &str,
        _bytes: &[u8],
    ) -> Result<StoredImage, AvatarError> {
        if *self.fail_writes.read().unwrap() {
            return Err(AvatarError::storage("disk full"));
        }

        let mut images = self.images.write().unwrap();
        let path = format!("{user_id}/{}-{file_name}", images.len());
        images.insert(path.clone());
        Ok(StoredImage::new(path))
    }

    async fn url_for(
        &self,
        image: &StoredImage,
        size: u32,
    ) -> Result<Option<String>, AvatarError> {
        let key = (image.as_str().to_string(), size);
        Ok(self
            .rendered
            .read()
            .unwrap()
            .contains(&key)
            .then(|| format!("/media/resized/{size}/{}", image.as_str())))
    }

    async fn remove(&self, image: &StoredImage) -> Result<(), AvatarError> {
        self.images.write().unwrap().remove(image.as_str());
        Ok(())
    }
}

/// Cache that remembers every invalidation it received.
#[derive(Clone, Default)]
pub struct RecordingUrlCache {
    entries: Arc<Mutex<HashMap<(UserId, u32), String>>>,
    invalidations: Arc<Mutex<Vec<UserId>>>,
}

impl RecordingUrlCache {
    pub fn invalidations(&self) -> Vec<UserId> {
        self.invalidations.lock().unwrap().clone()
    }

    fn invalidation_count(&self, user_id: &UserId) -> u64 {
        self.invalidations
            .lock()
            .unwrap()
            .iter()
            .filter(|invalidated| *invalidated == user_id)
            .count() as u64
    }
}

impl AvatarUrlCache for RecordingUrlCache {
    fn get(&self, user_id: &UserId, size: u32) -> Option<String> {
        self.entries.lock().unwrap().get(&(*user_id, size)).cloned()
    }

    fn generation(&self, user_id: &UserId) -> u64 {
        self.invalidation_count(user_id)
    }

    fn insert(&self, user_id: &UserId, size: u32, url: String, generation: u64) {
        if self.invalidation_count(user_id) == generation {
            self.entries.lock().unwrap().insert((*user_id, size), url);
        }
    }

    fn invalidate(&self, user_id: &UserId) {
        self.entries
            .lock()
            .unwrap()
            .retain(|(cached, _), _| cached != user_id);
        self.invalidations.lock().unwrap().push(*user_id);
    }
}

/// Event sink collecting published events in order.
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<AvatarUpdated>>>,
}

impl RecordingEventSink {
    pub fn events(&self) -> Vec<AvatarUpdated> {
        self.events.lock().unwrap().clone()
    }
}

impl AvatarEventSink for RecordingEventSink {
    fn publish(&self, event: AvatarUpdated) {
        self.events.lock().unwrap().push(event);
    }
}
