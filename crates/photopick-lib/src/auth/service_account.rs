use super::token::{default_token_uri, exchange, now_unix};
use super::{AuthError, Credential, CredentialProvider};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// The fields of a service-account JSON key that the token exchange needs.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: SecretString,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let data = std::fs::read_to_string(path).map_err(|e| AuthError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let key: Self = serde_json::from_str(&data).map_err(|e| AuthError::Parse {
            source_name: format!("service account key {}", path.display()),
            reason: e.to_string(),
        })?;
        if key.client_email.is_empty() {
            return Err(AuthError::MissingField {
                source_name: format!("service account key {}", path.display()),
                field: "client_email".to_string(),
            });
        }
        Ok(key)
    }

    /// Signed RS256 assertion requesting `scopes`, valid from `issued_at`.
    pub fn assertion(&self, scopes: &[String], issued_at: u64) -> Result<String, AuthError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: scopes.join(" "),
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|e| AuthError::Signing {
                reason: e.to_string(),
            })?;
        jsonwebtoken::encode(&header, &claims, &key).map_err(|e| AuthError::Signing {
            reason: e.to_string(),
        })
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

/// Bearer tokens obtained by exchanging a signed service-account assertion.
pub struct ServiceAccount {
    key_file: PathBuf,
    scopes: Vec<String>,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ServiceAccount {
    pub fn new(
        key_file: PathBuf,
        scopes: Vec<String>,
        client: reqwest::Client,
        request_timeout: Duration,
    ) -> Self {
        Self {
            key_file,
            scopes,
            client,
            request_timeout,
        }
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccount {
    fn name(&self) -> &'static str {
        "service_account"
    }

    async fn credential(&self) -> Result<Credential, AuthError> {
        let key = ServiceAccountKey::load(&self.key_file)?;
        let assertion = key.assertion(&self.scopes, now_unix())?;

        tracing::info!(client_email = %key.client_email, "Authenticating with service account");
        let response = exchange(
            &self.client,
            &key.token_uri,
            &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
            self.request_timeout,
        )
        .await?;

        Ok(Credential::Bearer(response.access_token))
    }
}
