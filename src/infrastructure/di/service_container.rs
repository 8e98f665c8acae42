//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{OrdererService, ReconcileService, ResolverService};
use crate::config::Settings;
use crate::infrastructure::registry::RegistryClient;
use crate::infrastructure::traits::{Registry, UreqTransport};

/// Container holding the settings and the registry shared by all services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Registry abstraction
    pub registry: Arc<dyn Registry>,
}

impl ServiceContainer {
    /// Create a new service container with the HTTP registry client.
    pub fn new(settings: Settings, debug: bool) -> Self {
        let transport = Arc::new(UreqTransport::new(settings.registry.timeout()));
        let registry = Arc::new(RegistryClient::new(
            settings.registry.clone(),
            transport,
            debug,
        ));
        Self::with_deps(settings, registry)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, registry: Arc<dyn Registry>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, registry }
    }

    pub fn resolver(&self) -> ResolverService {
        ResolverService::new(self.registry.clone(), self.settings.on_create_failure)
    }

    pub fn orderer(&self) -> OrdererService {
        OrdererService::new(self.registry.clone())
    }

    pub fn reconcile(&self) -> ReconcileService {
        ReconcileService::new(self.resolver(), self.orderer())
    }
}
