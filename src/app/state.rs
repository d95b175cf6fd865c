//! Application state shared across routes

use std::sync::Arc;

use crate::catalog::JetCatalog;
use crate::config::Config;
use crate::game::ArenaHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<JetCatalog>,
    pub arena: ArenaHandle,
}

impl AppState {
    pub fn new(config: Config, catalog: JetCatalog, arena: ArenaHandle) -> Self {
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            arena,
        }
    }
}
