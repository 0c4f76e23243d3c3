use std::sync::Arc;

use crate::db::Store;
use crate::services::{ChatService, Hub, MatchEngine, SessionConfig};

#[derive(Clone)]
pub struct AppState {
    pub engine: MatchEngine,
    pub chat: ChatService,
    pub hub: Hub,
    pub session: SessionConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, session: SessionConfig) -> Self {
        let hub = Hub::new();
        Self {
            engine: MatchEngine::new(store.clone(), hub.clone()),
            chat: ChatService::new(store, hub.clone()),
            hub,
            session,
        }
    }
}
