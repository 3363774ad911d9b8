use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::domain::{
    models::{StoredImage, UserId},
    ports::outbound::AvatarStorage,
    AvatarError,
};

const RESIZED_DIR: &str = "resized";

/// Stores avatars on local disk.
///
/// Originals live at `{root}/{user_id}/{file}`; an artifact rendered at size N
/// lives at `{root}/resized/{N}/{user_id}/{file}` and is served below `media_url`.
#[derive(Debug, Clone)]
pub struct FilesystemAvatarStorage {
    root: PathBuf,
    media_url: String,
    hash_filenames: bool,
}

impl FilesystemAvatarStorage {
    pub fn new(root: PathBuf, media_url: impl Into<String>, hash_filenames: bool) -> Self {
        Self {
            root,
            media_url: media_url.into().trim_end_matches('/').to_string(),
            hash_filenames,
        }
    }

    pub async fn initialize(&self) -> Result<(), AvatarError> {
        fs::create_dir_all(self.root.join(RESIZED_DIR)).await?;
        info!("Avatar storage initialized at: {}", self.root.display());
        Ok(())
    }

    fn artifact_path(&self, image: &StoredImage, size: u32) -> PathBuf {
        self.root
            .join(RESIZED_DIR)
            .join(size.to_string())
            .join(image.as_str())
    }

    fn derive_name(&self, file_name: &str) -> String {
        if !self.hash_filenames {
            return file_name.to_string();
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("img");

        let mut hasher = Sha256::new();
        hasher.update(file_name.as_bytes());
        hasher.update(OffsetDateTime::now_utc().unix_timestamp_nanos().to_be_bytes());
        let hash = hasher.finalize();
        format!("{}.{extension}", &format!("{:x}", hash)[..16])
    }

    /// Create a new file in `dir`, suffixing `_1`, `_2`, ... on collision.
    ///
    /// The file is opened with `create_new`, so two concurrent uploads of the
    /// same name can never end up sharing one file.
    async fn create_unique(
        &self,
        dir: &Path,
        name: &str,
    ) -> Result<(String, fs::File), AvatarError> {
        let path = Path::new(name);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("avatar");
        let extension = path.extension().and_then(|e| e.to_str());

        let mut counter = 0u32;
        loop {
            let candidate = match (counter, extension) {
                (0, _) => name.to_string(),
                (_, Some(ext)) => format!("{stem}_{counter}.{ext}"),
                (_, None) => format!("{stem}_{counter}"),
            };

            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&candidate))
                .await;

            match opened {
                Ok(file) => return Ok((candidate, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), AvatarError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl AvatarStorage for FilesystemAvatarStorage {
    async fn save(
        &self,
        user_id: &UserId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, AvatarError> {
        let user_dir = self.root.join(user_id.to_string());
        fs::create_dir_all(&user_dir).await?;

        let (name, mut file) = self
            .create_unique(&user_dir, &self.derive_name(file_name))
            .await?;

        file.write_all(bytes).await?;
        file.flush().await?;

        debug!("Stored avatar image {}/{} ({} bytes)", user_id, name, bytes.len());
        Ok(StoredImage::new(format!("{user_id}/{name}")))
    }

    async fn url_for(
        &self,
        image: &StoredImage,
        size: u32,
    ) -> Result<Option<String>, AvatarError> {
        if !fs::try_exists(self.artifact_path(image, size)).await? {
            return Ok(None);
        }

        Ok(Some(format!(
            "{}/{RESIZED_DIR}/{size}/{}",
            self.media_url,
            image.as_str()
        )))
    }

    async fn remove(&self, image: &StoredImage) -> Result<(), AvatarError> {
        remove_if_exists(&self.root.join(image.as_str())).await?;

        let resized_dir = self.root.join(RESIZED_DIR);
        if !fs::try_exists(&resized_dir).await? {
            return Ok(());
        }

        let mut sizes = fs::read_dir(&resized_dir).await?;
        while let Some(entry) = sizes.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                remove_if_exists(&entry.path().join(image.as_str())).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn storage(dir: &TempDir, hash: bool) -> FilesystemAvatarStorage {
        FilesystemAvatarStorage::new(dir.path().to_path_buf(), "/media/avatars/", hash)
    }

    #[tokio::test]
    async fn save_writes_under_user_directory() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, false);

        let image = storage
            .save(&UserId::new(7), "me.png", b"bytes")
            .await
            .unwrap();

        assert_eq!(image.as_str(), "7/me.png");
        let written = std::fs::read(dir.path().join("7/me.png")).unwrap();
        assert_eq!(written, b"bytes");
    }

    #[tokio::test]
    async fn save_never_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, false);

        let first = storage.save(&UserId::new(7), "me.png", b"a").await.unwrap();
        let second = storage.save(&UserId::new(7), "me.png", b"b").await.unwrap();

        assert_eq!(first.as_str(), "7/me.png");
        assert_eq!(second.as_str(), "7/me_1.png");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_of_one_name_get_distinct_files() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, false);

        let mut uploads = tokio::task::JoinSet::new();
        for n in 0..8u8 {
            let storage = storage.clone();
            uploads.spawn(async move {
                let image = storage.save(&UserId::new(7), "me.png", &[n]).await.unwrap();
                (image, n)
            });
        }

        let mut names = HashSet::new();
        while let Some(joined) = uploads.join_next().await {
            let (image, n) = joined.unwrap();
            let written = std::fs::read(dir.path().join(image.as_str())).unwrap();
            assert_eq!(written, vec![n]);
            names.insert(image.as_str().to_string());
        }

        assert_eq!(names.len(), 8);
        assert!(names.contains("7/me.png"));
    }

    #[tokio::test]
    async fn hashed_names_keep_extension() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, true);

        let image = storage.save(&UserId::new(7), "me.png", b"a").await.unwrap();

        let name = image.as_str().strip_prefix("7/").unwrap();
        assert_eq!(name.len(), "0123456789abcdef.png".len());
        assert!(name.ends_with(".png"));
    }

    #[tokio::test]
    async fn url_only_for_rendered_sizes() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, false);
        let image = storage.save(&UserId::new(7), "me.png", b"a").await.unwrap();

        assert_eq!(storage.url_for(&image, 80).await.unwrap(), None);

        let artifact = dir.path().join("resized/80/7/me.png");
        std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        std::fs::write(&artifact, b"small").unwrap();

        assert_eq!(
            storage.url_for(&image, 80).await.unwrap().as_deref(),
            Some("/media/avatars/resized/80/7/me.png")
        );
    }

    #[tokio::test]
    async fn remove_deletes_original_and_artifacts() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, false);
        storage.initialize().await.unwrap();
        let image = storage.save(&UserId::new(7), "me.png", b"a").await.unwrap();
        let artifact = dir.path().join("resized/80/7/me.png");
        std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        std::fs::write(&artifact, b"small").unwrap();

        storage.remove(&image).await.unwrap();

        assert!(!dir.path().join("7/me.png").exists());
        assert!(!artifact.exists());
        // removing twice is fine
        storage.remove(&image).await.unwrap();
    }
}
