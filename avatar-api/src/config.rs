use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;
use serde_with::serde_as;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use strum::{Display, EnumString};

use crate::domain::{services::DirectorySettings, upload::UploadPolicy};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub avatar: AvatarSettings,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub app_url: String,
    pub static_url: String,
    pub media_url: String,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

/// The host's identity provider hands the authenticated username over in a
/// request header; this service never authenticates on its own.
#[derive(Deserialize, Clone, Debug)]
pub struct AuthSettings {
    pub identity_header: String,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct AvatarSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub max_avatars_per_user: usize,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub default_size: u32,
    pub default_url: String,
    pub storage_dir: PathBuf,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub max_size: usize,
    #[serde(default)]
    pub allowed_file_extensions: Option<Vec<String>>,
    #[serde(default)]
    pub hash_filenames: bool,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub cache_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

impl AvatarSettings {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.max_avatars_per_user < 1 {
            return Err(config::ConfigError::Message(
                "avatar.max_avatars_per_user must be at least 1".to_string(),
            ));
        }
        if self.default_size < 1 {
            return Err(config::ConfigError::Message(
                "avatar.default_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }

    /// Absolute or root-relative URLs are used as they are, anything else is
    /// resolved against `static_url`.
    pub fn default_avatar_url(&self, static_url: &str) -> String {
        let url = self.default_url.as_str();
        if url.starts_with("http://") || url.starts_with("https://") || url.starts_with('/') {
            url.to_string()
        } else {
            format!("{}/{}", static_url.trim_end_matches('/'), url)
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_size: self.max_size,
            allowed_extensions: self.allowed_file_extensions.as_ref().map(|exts| {
                exts.iter()
                    .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                    .collect()
            }),
            max_avatars_per_user: self.max_avatars_per_user,
        }
    }

    pub fn directory_settings(&self, static_url: &str) -> DirectorySettings {
        DirectorySettings {
            max_avatars_per_user: self.max_avatars_per_user,
            default_size: self.default_size,
            default_url: self.default_avatar_url(static_url),
            upload: self.upload_policy(),
        }
    }
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let config_directory = base_path.join("config");

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .expect("Failed to parse APP_ENVIRONMENT");
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("AVATAR")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.avatar.validate()?;

    Ok(settings)
}

#[derive(Display, Debug, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}
