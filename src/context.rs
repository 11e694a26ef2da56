use std::sync::Arc;

use crate::config::AppConfig;
use crate::rpc::{Broadcaster, ConnectionManager};

/// Shared wiring handed to every domain module at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub connections: ConnectionManager,
    pub broadcaster: Broadcaster,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        let connections = ConnectionManager::new();
        let broadcaster = Broadcaster::new(connections.clone());

        Self {
            config: Arc::new(config),
            connections,
            broadcaster,
        }
    }
}
