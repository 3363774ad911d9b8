//! Composition root: the only place that wires concrete outbound adapters
//! into the avatar directory.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    adapters::outbound::{
        events::AvatarEventBus, filesystem::FilesystemAvatarStorage, moka::MokaAvatarUrlCache,
        postgres::PostgresAvatarRepository,
    },
    config::Settings,
    domain::{ports::inbound::AvatarService, services::AvatarServiceImpl, AvatarError},
};

const URL_CACHE_CAPACITY: u64 = 10_000;
const EVENT_BUS_CAPACITY: usize = 256;

pub struct AvatarComponents {
    pub service: Arc<dyn AvatarService>,
    pub events: AvatarEventBus,
}

pub async fn build_avatar_components(
    pool: PgPool,
    settings: &Settings,
) -> Result<AvatarComponents, AvatarError> {
    let avatar = &settings.avatar;

    let storage = FilesystemAvatarStorage::new(
        avatar.storage_dir.clone(),
        settings.application.media_url.clone(),
        avatar.hash_filenames,
    );
    storage.initialize().await?;

    let events = AvatarEventBus::new(EVENT_BUS_CAPACITY);
    let cache = MokaAvatarUrlCache::new(URL_CACHE_CAPACITY, avatar.cache_timeout());

    let service = AvatarServiceImpl::new(
        Arc::new(PostgresAvatarRepository::new(pool)),
        Arc::new(storage),
        Arc::new(cache),
        Arc::new(events.clone()),
        avatar.directory_settings(&settings.application.static_url),
    );

    Ok(AvatarComponents {
        service: Arc::new(service),
        events,
    })
}
