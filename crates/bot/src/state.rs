use comicrelay_core::{Config, JobOrchestrator, SessionStore};

use crate::delivery::Delivery;

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: JobOrchestrator,
    sessions: SessionStore,
    delivery: Delivery,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: JobOrchestrator,
        sessions: SessionStore,
        delivery: Delivery,
    ) -> Self {
        Self {
            config,
            orchestrator,
            sessions,
            delivery,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &JobOrchestrator {
        &self.orchestrator
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }
}
