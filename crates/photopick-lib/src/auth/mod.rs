//! Credential acquisition for the listing API.
//!
//! Every strategy sits behind [`CredentialProvider`]; callers only ever see the
//! resulting [`Credential`] and apply it to outgoing requests.

mod api_key;
mod oauth;
mod service_account;
mod token;

pub use api_key::ApiKeyProvider;
pub use oauth::{AuthorizedUserFile, OAuthUserFlow};
pub use service_account::{ServiceAccount, ServiceAccountKey};
pub use token::DEFAULT_TOKEN_URI;
pub(crate) use token::serialize_secret;

use crate::config::AuthConfig;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("{source_name} is missing required field {field}")]
    MissingField { source_name: String, field: String },

    #[error("Token exchange with {token_uri} failed: {reason}")]
    TokenExchange { token_uri: String, reason: String },

    #[error("Failed to sign token assertion: {reason}")]
    Signing { reason: String },

    #[error("Failed to persist refreshed token to {}: {reason}", .path.display())]
    Persist { path: PathBuf, reason: String },
}

/// A credential ready to be attached to a request.
#[derive(Clone, Debug)]
pub enum Credential {
    Bearer(SecretString),
    ApiKey(SecretString),
}

impl Credential {
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token.expose_secret()),
            Self::ApiKey(key) => request.header("X-API-Key", key.expose_secret()),
        }
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    async fn credential(&self) -> Result<Credential, AuthError>;
}

/// `request_timeout` bounds every token exchange the provider performs.
pub fn provider_from_config(
    auth: &AuthConfig,
    scopes: &[String],
    client: reqwest::Client,
    request_timeout: Duration,
) -> Box<dyn CredentialProvider> {
    match auth {
        AuthConfig::ApiKey { api_key } => Box::new(ApiKeyProvider::new(api_key.clone())),
        AuthConfig::Oauth { token_file } => Box::new(OAuthUserFlow::new(
            token_file.clone(),
            client,
            request_timeout,
        )),
        AuthConfig::ServiceAccount { key_file } => Box::new(ServiceAccount::new(
            key_file.clone(),
            scopes.to_vec(),
            client,
            request_timeout,
        )),
    }
}
