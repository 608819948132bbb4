use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::engine::Downloader;
use crate::extension::ExtensionHost;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<dyn Downloader>,
    pub extensions: Arc<dyn ExtensionHost>,
    /// Client used by the relay endpoint
    pub http: Client,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        engine: Arc<dyn Downloader>,
        extensions: Arc<dyn ExtensionHost>,
        http: Client,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            extensions,
            http,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.config.server.api.max_body_bytes.as_usize()
    }
}
