//! Shared state handed to every request handler.

use std::sync::Arc;

use evhub_core::Hub;
use evhub_types::config::DaemonConfig;

/// Cloned into each handler by axum; all fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub config: Arc<DaemonConfig>,
}

impl AppState {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            hub: Hub::new(config.events.clone()),
            config: Arc::new(config),
        }
    }
}
