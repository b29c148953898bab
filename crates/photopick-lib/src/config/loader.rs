use super::{AuthStrategy, Config};
use crate::error::PhotoPickError;
use crate::verification::HashAlgorithm;
use config::{Config as ConfigBuilder, Environment};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "PHOTOPICK";

/// Values given on the command line; these win over the config file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub album_id: Option<String>,
    pub auth_strategy: Option<AuthStrategy>,
    pub api_key: Option<String>,
    pub token_file: Option<PathBuf>,
    pub service_account_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub page_size: Option<u32>,
    pub api_endpoint: Option<String>,
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub keep_partial: bool,
    pub no_progress: bool,
}

impl ConfigOverrides {
    /// The explicit strategy, or the one implied by whichever credential flag was given.
    fn strategy(&self) -> Option<AuthStrategy> {
        self.auth_strategy.or_else(|| {
            if self.api_key.is_some() {
                Some(AuthStrategy::ApiKey)
            } else if self.token_file.is_some() {
                Some(AuthStrategy::Oauth)
            } else if self.service_account_file.is_some() {
                Some(AuthStrategy::ServiceAccount)
            } else {
                None
            }
        })
    }
}

pub fn load_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<Config, PhotoPickError> {
    let environment = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__");
    load_config_with_environment(config_path, overrides, environment)
}

pub fn load_config_with_environment(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    environment: Environment,
) -> Result<Config, PhotoPickError> {
    let mut builder = ConfigBuilder::builder();
    if let Some(config_path) = config_path {
        builder = builder.add_source(config::File::from(config_path));
    }

    let path_string = |path: &Option<PathBuf>| path.as_ref().map(|p| p.display().to_string());

    let config_builder = builder
        .add_source(environment)
        .set_override_option("album_id", overrides.album_id.clone())?
        .set_override_option("auth.strategy", overrides.strategy().map(|s| s.as_str()))?
        .set_override_option("auth.api_key", overrides.api_key.clone())?
        .set_override_option("auth.token_file", path_string(&overrides.token_file))?
        .set_override_option("auth.key_file", path_string(&overrides.service_account_file))?
        .set_override_option("output_dir", path_string(&overrides.output_dir))?
        .set_override_option("ledger_path", path_string(&overrides.ledger_path))?
        .set_override_option("hash_algorithm", overrides.hash_algorithm.map(|a| a.as_str()))?
        .set_override_option("page_size", overrides.page_size.map(i64::from))?
        .set_override_option("api_endpoint", overrides.api_endpoint.clone())?
        .set_override_option("retry.max_retries", overrides.max_retries.map(i64::from))?
        .set_override_option(
            "retry.initial_backoff_ms",
            overrides.initial_backoff_ms.map(|v| v.to_string()),
        )?
        .set_override_option(
            "timeouts.request_secs",
            overrides.request_timeout_secs.map(|v| v.to_string()),
        )?
        .set_override_option(
            "delete_partial_on_failure",
            overrides.keep_partial.then_some(false),
        )?
        .set_override_option("show_progress", overrides.no_progress.then_some(false))?
        .build()?;

    let app_config: Config = config_builder.try_deserialize()?;
    app_config.validate()?;
    Ok(app_config)
}
