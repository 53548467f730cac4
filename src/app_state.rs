//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::delivery::BackpressurePolicy;
use crate::generator::PayloadGenerator;
use crate::session::SessionRegistry;
use crate::ws::Dispatcher;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Control message router; owns the session registry.
    pub dispatcher: Dispatcher,
    /// Flow control applied to every connection's transport.
    pub policy: BackpressurePolicy,
}

impl AppState {
    /// Builds the state for `config` with a fresh registry.
    #[must_use]
    pub fn new(config: &ServerConfig, generator: Arc<dyn PayloadGenerator>) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        Self {
            dispatcher: Dispatcher::new(registry, generator, config),
            policy: BackpressurePolicy::from_config(config),
        }
    }

    /// The session registry shared by all connections.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.dispatcher.registry()
    }
}
