//! Application state shared across handlers.

use crate::registry::Registry;
use reg_core::config::AppConfig;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Registry coordinator.
    pub registry: Arc<Registry>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, registry: Arc<Registry>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
        }
    }
}
