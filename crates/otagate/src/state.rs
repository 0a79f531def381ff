//! Application state shared across HTTP handlers

use std::sync::Arc;

use otagate_core::OtaService;

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Device operations against the configured backends
    pub service: OtaService,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Self {
        Self {
            service: OtaService::new(config.backends.clone()),
            config: Arc::new(config),
        }
    }
}
