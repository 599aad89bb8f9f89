use std::sync::Arc;
use statif_core::{Config, LifecycleService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    lifecycle: Arc<LifecycleService>,
}

impl AppState {
    pub fn new(config: Config, lifecycle: Arc<LifecycleService>) -> Self {
        Self { config, lifecycle }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn lifecycle(&self) -> &LifecycleService {
        self.lifecycle.as_ref()
    }
}
