use std::sync::Arc;

use decora_db::DbPool;

use crate::config::ServerConfig;
use crate::services::GenerationService;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    pub generations: Arc<GenerationService>,
}
