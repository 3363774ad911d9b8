use crate::domain::{models::AvatarUpload, AvatarError};

/// Rules an uploaded image must satisfy before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_size: usize,
    /// Lower-case extensions without the leading dot. `None` accepts any image.
    pub allowed_extensions: Option<Vec<String>>,
    pub max_avatars_per_user: usize,
}

impl UploadPolicy {
    /// Validate `upload` for a user who already owns `existing` avatars.
    ///
    /// Returns the file extension the stored image should carry.
    pub fn check(&self, upload: &AvatarUpload, existing: usize) -> Result<String, AvatarError> {
        let extension = upload.extension().unwrap_or_default();

        if let Some(allowed) = &self.allowed_extensions {
            if !allowed.iter().any(|ext| ext.eq_ignore_ascii_case(&extension)) {
                return Err(AvatarError::UnsupportedFileType(format!(
                    "{} (allowed: {})",
                    if extension.is_empty() { "none" } else { &extension },
                    allowed.join(", ")
                )));
            }
        }

        if upload.bytes.len() > self.max_size {
            return Err(AvatarError::PayloadTooLarge {
                size: upload.bytes.len(),
                max: self.max_size,
            });
        }

        // A limit of one means "replace", so uploads are never refused then.
        if self.max_avatars_per_user > 1 && existing >= self.max_avatars_per_user {
            return Err(AvatarError::TooManyAvatars {
                count: existing,
                max: self.max_avatars_per_user,
            });
        }

        let format = image::guess_format(&upload.bytes).map_err(|_| AvatarError::InvalidImage)?;

        if extension.is_empty() {
            Ok(format
                .extensions_str()
                .first()
                .copied()
                .unwrap_or("img")
                .to_string())
        } else {
            Ok(extension)
        }
    }
}
