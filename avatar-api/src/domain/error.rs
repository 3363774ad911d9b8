use thiserror::Error;

/// Errors that can occur during avatar operations.
#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid image payload")]
    InvalidImage,
    #[error("avatar payload is {size} bytes, the maximum allowed is {max}")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("you already have {count} avatars, and the maximum allowed is {max}")]
    TooManyAvatars { count: usize, max: usize },
    #[error("avatar not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Storage(String),
}

impl AvatarError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the error was caused by caller input rather than by a collaborator.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::InvalidImage
                | Self::PayloadTooLarge { .. }
                | Self::UnsupportedFileType(_)
                | Self::TooManyAvatars { .. }
        )
    }
}

impl From<sqlx::Error> for AvatarError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<std::io::Error> for AvatarError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
