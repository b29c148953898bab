use super::token::{
    EXPIRY_MARGIN_SECS, default_token_uri, exchange, now_unix, serialize_option_secret,
    serialize_secret,
};
use super::{AuthError, Credential, CredentialProvider};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// On-disk token material for the authorized-user flow.
///
/// The refresh token is obtained once through the interactive consent flow;
/// afterwards the cached access token is reused until it nears expiry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizedUserFile {
    pub client_id: String,
    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: SecretString,
    #[serde(serialize_with = "serialize_secret")]
    pub refresh_token: SecretString,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<SecretString>,
    /// Unix timestamp when `access_token` expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl AuthorizedUserFile {
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let data = std::fs::read_to_string(path).map_err(|e| AuthError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&data).map_err(|e| AuthError::Parse {
            source_name: format!("token file {}", path.display()),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        let persist_error = |reason: String| AuthError::Persist {
            path: path.to_path_buf(),
            reason,
        };
        let data = serde_json::to_string_pretty(self).map_err(|e| persist_error(e.to_string()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| persist_error(e.to_string()))?;
        temp.write_all(data.as_bytes())
            .map_err(|e| persist_error(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| persist_error(e.to_string()))?;
        }

        temp.persist(path)
            .map_err(|e| persist_error(e.error.to_string()))?;
        Ok(())
    }

    fn cached_access_token(&self, now: u64) -> Option<&SecretString> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if expires_at > now + EXPIRY_MARGIN_SECS => Some(token),
            _ => None,
        }
    }
}

/// Bearer tokens from a refresh token persisted in a local token file.
pub struct OAuthUserFlow {
    token_file: PathBuf,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl OAuthUserFlow {
    pub fn new(token_file: PathBuf, client: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            token_file,
            client,
            request_timeout,
        }
    }
}

#[async_trait]
impl CredentialProvider for OAuthUserFlow {
    fn name(&self) -> &'static str {
        "oauth"
    }

    async fn credential(&self) -> Result<Credential, AuthError> {
        let mut stored = AuthorizedUserFile::load(&self.token_file)?;
        let now = now_unix();

        if let Some(token) = stored.cached_access_token(now) {
            tracing::debug!(token_file = %self.token_file.display(), "Reusing cached access token");
            return Ok(Credential::Bearer(token.clone()));
        }

        tracing::info!(token_uri = %stored.token_uri, "Refreshing access token");
        let response = exchange(
            &self.client,
            &stored.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", stored.refresh_token.expose_secret().as_str()),
                ("client_id", stored.client_id.as_str()),
                ("client_secret", stored.client_secret.expose_secret().as_str()),
            ],
            self.request_timeout,
        )
        .await?;

        stored.access_token = Some(response.access_token.clone());
        stored.expires_at = response.expires_in.map(|secs| now + secs);
        if let Err(e) = stored.save(&self.token_file) {
            // The fresh token is still usable for this run.
            tracing::warn!(error = %e, "Could not persist refreshed token");
        }

        Ok(Credential::Bearer(response.access_token))
    }
}
