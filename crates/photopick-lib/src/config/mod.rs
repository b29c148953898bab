mod loader;
mod model;

pub use loader::{ConfigOverrides, ENV_PREFIX, load_config, load_config_with_environment};
pub use model::{
    AuthConfig, Config, DEFAULT_API_ENDPOINT, DEFAULT_PAGE_SIZE, DEFAULT_SCOPE, MAX_PAGE_SIZE,
    RetryConfig, TimeoutConfig,
};

use clap::ValueEnum;

/// Selects one of the [`AuthConfig`] variants from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthStrategy {
    Oauth,
    ApiKey,
    ServiceAccount,
}

impl AuthStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oauth => "oauth",
            Self::ApiKey => "api_key",
            Self::ServiceAccount => "service_account",
        }
    }
}
