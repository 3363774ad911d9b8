use serde::Serialize;
use time::OffsetDateTime;

use super::{AvatarId, UserId};

/// Reference to an image held by the blob storage, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StoredImage(String);

impl StoredImage {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StoredImage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Avatar {
    pub id: AvatarId,
    pub user_id: UserId,
    pub image: StoredImage,
    pub primary: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_uploaded: OffsetDateTime,
}

/// A freshly stored image waiting to be recorded as the user's new primary avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAvatar {
    pub user_id: UserId,
    pub image: StoredImage,
    pub date_uploaded: OffsetDateTime,
}

/// Raw upload as delivered by the HTTP layer.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AvatarUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Lower-cased extension of the uploaded file name, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// The resolved state of a user's avatars.
///
/// `avatars` keeps natural (upload) order and is bounded by the configured
/// maximum; when that maximum is 1 it only ever holds the primary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvatarDirectory {
    pub primary: Option<Avatar>,
    pub avatars: Vec<Avatar>,
}

impl AvatarDirectory {
    pub fn contains(&self, avatar_id: AvatarId) -> bool {
        self.avatars.iter().any(|avatar| avatar.id == avatar_id)
    }
}

/// Published whenever a user's avatar changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarUpdated {
    pub user_id: UserId,
    pub avatar_id: AvatarId,
}
