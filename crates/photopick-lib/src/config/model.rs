use crate::auth::serialize_secret;
use crate::error::PhotoPickError;
use crate::verification::HashAlgorithm;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_ENDPOINT: &str = "https://photoslibrary.googleapis.com/v1";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/photoslibrary.readonly";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Largest page the listing API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub album_id: String,
    pub auth: AuthConfig,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default = "default_true")]
    pub delete_partial_on_failure: bool,
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

/// How requests to the listing API are authenticated.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Authorized-user token file holding a refresh token.
    Oauth { token_file: PathBuf },
    /// Static API key, only usable with publicly shared albums.
    ApiKey {
        #[serde(serialize_with = "serialize_secret")]
        api_key: SecretString,
    },
    /// Service-account JSON key file.
    ServiceAccount { key_file: PathBuf },
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct TimeoutConfig {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            connect_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), PhotoPickError> {
        let invalid = |details: String| Err(PhotoPickError::CliArgumentValidation { details });

        if self.album_id.trim().is_empty() {
            return invalid("album_id must not be empty.".to_string());
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return invalid(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}.",
                self.page_size
            ));
        }
        if self.timeouts.request_secs == 0 || self.timeouts.connect_secs == 0 {
            return invalid("timeouts must be greater than 0.".to_string());
        }
        if let AuthConfig::ApiKey { api_key } = &self.auth
            && api_key.expose_secret().trim().is_empty()
        {
            return invalid("api_key must not be empty.".to_string());
        }
        url::Url::parse(&self.api_endpoint).map_err(|e| {
            PhotoPickError::CliArgumentValidation {
                details: format!("api_endpoint {} is not a valid URL: {}", self.api_endpoint, e),
            }
        })?;
        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloaded_photos")
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("fetched_photos.json")
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_scopes() -> Vec<String> {
    vec![DEFAULT_SCOPE.to_string()]
}

fn default_true() -> bool {
    true
}
