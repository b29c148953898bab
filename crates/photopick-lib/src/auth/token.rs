use super::AuthError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens closer than this to expiry are refreshed rather than reused.
pub(crate) const EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: SecretString,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

pub(crate) fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// POSTs a form to a token endpoint and decodes the access token. The whole
/// exchange, including the response body, must finish within `timeout`.
pub(crate) async fn exchange(
    client: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
    timeout: Duration,
) -> Result<TokenResponse, AuthError> {
    let exchange_error = |reason: String| AuthError::TokenExchange {
        token_uri: token_uri.to_string(),
        reason,
    };

    client
        .post(token_uri)
        .timeout(timeout)
        .form(form)
        .send()
        .await
        .map_err(|e| exchange_error(e.to_string()))?
        .error_for_status()
        .map_err(|e| exchange_error(e.to_string()))?
        .json::<TokenResponse>()
        .await
        .map_err(|e| exchange_error(format!("invalid token response: {}", e)))
}

pub(crate) fn serialize_secret<S: serde::Serializer>(
    secret: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

pub(crate) fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
