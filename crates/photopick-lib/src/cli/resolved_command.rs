use crate::cli::args::Args;
use crate::cli::params::PickParams;
use crate::config::load_config;
use crate::error::PhotoPickError;

/// Layers the config file, environment and flags into validated run parameters.
pub fn resolve_params(args: &Args) -> Result<PickParams, PhotoPickError> {
    if let Some(config_path) = &args.config_path {
        tracing::info!("Loading configuration from {}", config_path.display());
        if !config_path.exists() {
            return Err(PhotoPickError::CliArgumentValidation {
                details: format!("Config file {} does not exist.", config_path.display()),
            });
        }
    }

    let app_config = load_config(args.config_path.as_deref(), &args.overrides)?;
    Ok(PickParams { app_config })
}
