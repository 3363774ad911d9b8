use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::domain::{
    directory::{plan_deletion, resolve_directory},
    models::{
        Avatar, AvatarDirectory, AvatarId, AvatarUpdated, AvatarUpload, NewAvatar, UserId,
        UserKey,
    },
    ports::{
        inbound::AvatarService,
        outbound::{AvatarEventSink, AvatarRepository, AvatarStorage, AvatarUrlCache},
    },
    upload::UploadPolicy,
    AvatarError,
};

/// Settings the directory needs at runtime, already validated by the config layer.
#[derive(Debug, Clone)]
pub struct DirectorySettings {
    pub max_avatars_per_user: usize,
    pub default_size: u32,
    /// Fully resolved URL of the fallback avatar.
    pub default_url: String,
    pub upload: UploadPolicy,
}

pub struct AvatarServiceImpl<R, S, C, E> {
    repository: Arc<R>,
    storage: Arc<S>,
    cache: Arc<C>,
    events: Arc<E>,
    settings: DirectorySettings,
}

impl<R, S, C, E> AvatarServiceImpl<R, S, C, E> {
    pub fn new(
        repository: Arc<R>,
        storage: Arc<S>,
        cache: Arc<C>,
        events: Arc<E>,
        settings: DirectorySettings,
    ) -> Self {
        Self {
            repository,
            storage,
            cache,
            events,
            settings,
        }
    }
}

impl<R: AvatarRepository, S, C, E> AvatarServiceImpl<R, S, C, E> {
    async fn load(&self, user_id: &UserId) -> Result<(Vec<Avatar>, AvatarDirectory), AvatarError> {
        let owned = self.repository.list_for_user(user_id).await?;
        let directory = resolve_directory(&owned, self.settings.max_avatars_per_user);
        Ok((owned, directory))
    }
}

fn stored_file_name(upload: &AvatarUpload, extension: &str) -> String {
    let stem = std::path::Path::new(&upload.file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| {
            stem.chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
                .collect::<String>()
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "avatar".to_string());

    format!("{stem}.{extension}")
}

#[async_trait]
impl<R, S, C, E> AvatarService for AvatarServiceImpl<R, S, C, E>
where
    R: AvatarRepository,
    S: AvatarStorage,
    C: AvatarUrlCache,
    E: AvatarEventSink,
{
    async fn identify(&self, key: &UserKey) -> Result<Option<UserId>, AvatarError> {
        self.repository.find_user_by_key(key).await
    }

    async fn resolve(&self, user_id: &UserId) -> Result<AvatarDirectory, AvatarError> {
        let (owned, directory) = self.load(user_id).await?;
        debug!(
            user_id = %user_id,
            owned = owned.len(),
            visible = directory.avatars.len(),
            "resolved avatar directory"
        );
        Ok(directory)
    }

    async fn add(&self, user_id: &UserId, upload: AvatarUpload) -> Result<Avatar, AvatarError> {
        let existing = self.repository.list_for_user(user_id).await?.len();
        let extension = self.settings.upload.check(&upload, existing)?;

        let image = self
            .storage
            .save(user_id, &stored_file_name(&upload, &extension), &upload.bytes)
            .await?;

        let new_avatar = NewAvatar {
            user_id: *user_id,
            image: image.clone(),
            date_uploaded: OffsetDateTime::now_utc(),
        };

        let avatar = match self.repository.insert_primary(&new_avatar).await {
            Ok(avatar) => avatar,
            Err(err) => {
                if let Err(cleanup) = self.storage.remove(&image).await {
                    warn!(
                        "Failed to remove orphaned avatar image {}: {}",
                        image.as_str(),
                        cleanup
                    );
                }
                return Err(err);
            }
        };

        self.cache.invalidate(user_id);
        self.events.publish(AvatarUpdated {
            user_id: *user_id,
            avatar_id: avatar.id,
        });

        info!(user_id = %user_id, avatar_id = %avatar.id, "uploaded new primary avatar");
        Ok(avatar)
    }

    async fn set_primary(
        &self,
        user_id: &UserId,
        avatar_id: AvatarId,
    ) -> Result<Avatar, AvatarError> {
        let (_, directory) = self.load(user_id).await?;

        if !directory.contains(avatar_id) {
            return Err(AvatarError::validation(format!(
                "select a valid choice, {avatar_id} is not one of the available avatars"
            )));
        }

        let avatar = self.repository.set_primary(user_id, &avatar_id).await?;

        self.cache.invalidate(user_id);
        self.events.publish(AvatarUpdated {
            user_id: *user_id,
            avatar_id: avatar.id,
        });

        info!(user_id = %user_id, avatar_id = %avatar.id, "changed primary avatar");
        Ok(avatar)
    }

    async fn delete(&self, user_id: &UserId, avatar_ids: &[AvatarId]) -> Result<(), AvatarError> {
        if avatar_ids.is_empty() {
            return Ok(());
        }

        let (owned, directory) = self.load(user_id).await?;
        let plan = plan_deletion(&owned, &directory, avatar_ids);
        if plan.is_empty() {
            debug!(user_id = %user_id, "nothing to delete");
            return Ok(());
        }

        if let Some(replacement) = plan.replacement {
            let avatar = self.repository.set_primary(user_id, &replacement).await?;
            self.cache.invalidate(user_id);
            self.events.publish(AvatarUpdated {
                user_id: *user_id,
                avatar_id: avatar.id,
            });
            info!(user_id = %user_id, avatar_id = %avatar.id, "reassigned primary avatar");
        }

        let removed = self.repository.delete_many(user_id, &plan.ids).await?;

        if plan.removes_primary && plan.replacement.is_none() {
            self.cache.invalidate(user_id);
        }

        for avatar in &removed {
            if let Err(err) = self.storage.remove(&avatar.image).await {
                warn!(
                    "Failed to remove image {} of deleted avatar {}: {}",
                    avatar.image.as_str(),
                    avatar.id,
                    err
                );
            }
        }

        info!(user_id = %user_id, deleted = removed.len(), "deleted avatars");
        Ok(())
    }

    async fn primary_avatar_url(&self, key: &UserKey, size: u32) -> Result<String, AvatarError> {
        let Some(user_id) = self.identify(key).await? else {
            return Ok(self.settings.default_url.clone());
        };

        if let Some(url) = self.cache.get(&user_id, size) {
            return Ok(url);
        }
        let generation = self.cache.generation(&user_id);

        let Some(primary) = self.repository.primary_for_user(&user_id).await? else {
            return Ok(self.settings.default_url.clone());
        };

        match self.storage.url_for(&primary.image, size).await? {
            Some(url) => {
                self.cache.insert(&user_id, size, url.clone(), generation);
                Ok(url)
            }
            None => {
                debug!(user_id = %user_id, size, "no rendered artifact, using default avatar");
                Ok(self.settings.default_url.clone())
            }
        }
    }

    fn default_size(&self) -> u32 {
        self.settings.default_size
    }
}
