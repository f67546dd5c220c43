//! Environment-driven configuration.
//!
//! All knobs are read once at startup into a [`Settings`] value which is then
//! passed to [`crate::ScamShield`]; nothing reads the environment afterwards.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Cold-storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    Local,
    S3,
}

impl StorageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::S3 => "S3",
        }
    }
}

impl FromStr for StorageProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(Self::Local),
            "S3" => Ok(Self::S3),
            other => Err(Error::Config(format!("unknown storage provider: {other}"))),
        }
    }
}

/// Runtime configuration for the analysis and alerting core.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path or URL of the store of record
    pub database_url: String,
    /// Optional remote KV service URL; absent means in-process cache only
    pub kv_url: Option<String>,
    /// Secret used by the embedding application for token signing
    pub signing_secret: String,
    /// Access token lifetime in minutes
    pub access_token_ttl_minutes: u64,
    /// Text-model provider key (Groq)
    pub groq_api_key: Option<String>,
    /// Vision/fallback provider key (Gemini)
    pub gemini_api_key: Option<String>,
    /// Notification transport key (CallMeBot)
    pub notification_api_key: Option<String>,
    /// Whether outbound notifications are enabled
    pub notifications_enabled: bool,
    /// Cold-storage backend
    pub storage_provider: StorageProvider,
    /// Bucket name when the S3 backend is selected
    pub s3_bucket_name: Option<String>,
    /// Base directory for the local storage backend
    pub archive_dir: PathBuf,
    /// Vision model ids tried in priority order for image analysis
    pub vision_models: Vec<String>,
    /// Verbose diagnostics
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "scamshield.db".to_string(),
            kv_url: None,
            signing_secret: "change-me-in-production".to_string(),
            access_token_ttl_minutes: 30,
            groq_api_key: None,
            gemini_api_key: None,
            notification_api_key: None,
            notifications_enabled: true,
            storage_provider: StorageProvider::Local,
            s3_bucket_name: None,
            archive_dir: PathBuf::from("archives"),
            vision_models: default_vision_models(),
            debug: false,
        }
    }
}

/// Default vision model priority order. Third-party availability drifts, so
/// deployments override this through `VISION_MODELS`.
pub fn default_vision_models() -> Vec<String> {
    vec![
        "gemini-2.0-flash".to_string(),
        "gemini-1.5-flash".to_string(),
        "gemini-1.5-pro".to_string(),
    ]
}

impl Settings {
    /// Load settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let storage_provider = match env::var("STORAGE_PROVIDER") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.storage_provider,
        };

        let vision_models = match env::var("VISION_MODELS") {
            Ok(v) => v
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            Err(_) => defaults.vision_models,
        };

        let settings = Self {
            database_url: env_or("DATABASE_URL", defaults.database_url),
            kv_url: env::var("KV_URL").ok().filter(|v| !v.is_empty()),
            signing_secret: env_or("SIGNING_SECRET", defaults.signing_secret),
            access_token_ttl_minutes: env_parse(
                "ACCESS_TOKEN_TTL_MINUTES",
                defaults.access_token_ttl_minutes,
            )?,
            groq_api_key: env::var("GROQ_API_KEY").ok().filter(|v| !v.is_empty()),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty()),
            notification_api_key: env::var("CALLMEBOT_API_KEY")
                .ok()
                .filter(|v| !v.is_empty()),
            notifications_enabled: env_parse("CALLMEBOT_ENABLED", true)?,
            storage_provider,
            s3_bucket_name: env::var("S3_BUCKET_NAME").ok().filter(|v| !v.is_empty()),
            archive_dir: PathBuf::from(env_or(
                "ARCHIVE_DIR",
                defaults.archive_dir.display().to_string(),
            )),
            vision_models,
            debug: env_parse("DEBUG", false)?,
        };

        if settings.storage_provider == StorageProvider::S3 && settings.s3_bucket_name.is_none() {
            return Err(Error::Config(
                "S3 storage selected but S3_BUCKET_NAME is not set".to_string(),
            ));
        }

        Ok(settings)
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_storage_provider(mut self, provider: StorageProvider) -> Self {
        self.storage_provider = provider;
        self
    }

    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = dir.into();
        self
    }

    pub fn with_vision_models(mut self, models: Vec<String>) -> Self {
        self.vision_models = models;
        self
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {key}: {raw}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.storage_provider, StorageProvider::Local);
        assert_eq!(settings.access_token_ttl_minutes, 30);
        assert!(!settings.vision_models.is_empty());
    }

    #[test]
    fn test_storage_provider_parse() {
        assert_eq!(
            "local".parse::<StorageProvider>().unwrap(),
            StorageProvider::Local
        );
        assert_eq!("S3".parse::<StorageProvider>().unwrap(), StorageProvider::S3);
        assert!("gcs".parse::<StorageProvider>().is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let settings = Settings::default()
            .with_database_url(":memory:")
            .with_storage_provider(StorageProvider::S3)
            .with_archive_dir("/tmp/cold");

        assert_eq!(settings.database_url, ":memory:");
        assert_eq!(settings.storage_provider, StorageProvider::S3);
        assert_eq!(settings.archive_dir, PathBuf::from("/tmp/cold"));
    }
}
