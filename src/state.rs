use std::time::Duration;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("easyai/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http_client })
    }
}
