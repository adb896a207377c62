//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::SessionRegistry;
use crate::lobby::LobbyService;
use crate::store::{BirdsApiClient, RosterStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub birds_api: BirdsApiClient,
    pub roster_store: Arc<RosterStore>,
    pub lobby: Arc<LobbyService>,
    pub session_registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Upstream characters API
        let birds_api = BirdsApiClient::new(&config);

        // Roster cache feeding session admission
        let roster_store = Arc::new(RosterStore::new());

        // Session registry + lobby routing
        let session_registry = Arc::new(SessionRegistry::new());
        let lobby = Arc::new(LobbyService::new(
            session_registry.clone(),
            roster_store.clone(),
        ));

        Self {
            config,
            birds_api,
            roster_store,
            lobby,
            session_registry,
        }
    }
}
