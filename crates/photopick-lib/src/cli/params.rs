use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PickParams {
    pub app_config: Config,
}
