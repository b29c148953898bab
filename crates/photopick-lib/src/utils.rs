use crate::config::TimeoutConfig;
use crate::error::PhotoPickError;

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client. Per-request timeouts are applied by each caller, so only
/// the connect timeout is fixed here.
pub fn build_http_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client, PhotoPickError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeouts.connect())
        .build()?;
    Ok(client)
}
