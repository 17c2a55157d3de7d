//! Application state
//!
//! Bundles the injected capabilities (session store, CSRF service, login
//! service) with the configuration and the gate. Everything is behind an
//! `Arc`, so cloning the state is cheap and every request task shares the
//! same stores.

use std::sync::Arc;

use crate::auth::LoginService;
use crate::config::GatehouseConfig;
use crate::csrf::CsrfService;
use crate::gate::Gate;
use crate::routes::RouteTable;
use crate::session::SessionStore;

/// Shared state for the gatekeeper pipeline
#[derive(Clone)]
pub struct GatehouseState {
    config: Arc<GatehouseConfig>,
    sessions: Arc<dyn SessionStore>,
    csrf: Arc<CsrfService>,
    login: Arc<dyn LoginService>,
    gate: Arc<Gate>,
}

impl GatehouseState {
    /// Build state from configuration and injected capabilities
    ///
    /// The route table (and with it the gate) is derived from the
    /// configured asset prefixes and is read-only afterwards.
    #[must_use]
    pub fn new(
        config: GatehouseConfig,
        sessions: Arc<dyn SessionStore>,
        login: Arc<dyn LoginService>,
    ) -> Self {
        let gate = Gate::new(RouteTable::new(
            &config.assets.public_prefix,
            &config.assets.protected_prefix,
        ));
        Self {
            config: Arc::new(config),
            sessions,
            csrf: Arc::new(CsrfService::new()),
            login,
            gate: Arc::new(gate),
        }
    }

    /// Configuration reference
    #[must_use]
    pub fn config(&self) -> &GatehouseConfig {
        &self.config
    }

    /// The injected session store
    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// The CSRF token service
    #[must_use]
    pub fn csrf(&self) -> &Arc<CsrfService> {
        &self.csrf
    }

    /// The login collaborator
    #[must_use]
    pub fn login(&self) -> &Arc<dyn LoginService> {
        &self.login
    }

    /// The authorization gate
    #[must_use]
    pub fn gate(&self) -> &Arc<Gate> {
        &self.gate
    }
}

impl std::fmt::Debug for GatehouseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatehouseState")
            .field("config", &self.config)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
