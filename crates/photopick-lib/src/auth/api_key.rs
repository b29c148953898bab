use super::{AuthError, Credential, CredentialProvider};
use async_trait::async_trait;
use secrecy::SecretString;

/// Static API key. Only publicly shared albums can be listed this way.
pub struct ApiKeyProvider {
    api_key: SecretString,
}

impl ApiKeyProvider {
    pub fn new(api_key: SecretString) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl CredentialProvider for ApiKeyProvider {
    fn name(&self) -> &'static str {
        "api_key"
    }

    async fn credential(&self) -> Result<Credential, AuthError> {
        tracing::debug!("Using static API key");
        Ok(Credential::ApiKey(self.api_key.clone()))
    }
}
