//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use microfin_auth::{
    DecisionEngine, IdentityResolver, PolicyAdministration, PrimaryRoleResolver, TokenVerifier,
};
use microfin_persistence::PersistenceService;

use crate::api::route::RouteTable;

use super::config::Configuration;

pub struct AppState {
    pub configuration: Configuration,
    pub persistence: Arc<dyn PersistenceService>,
    pub primary_role: Arc<PrimaryRoleResolver>,
    pub identity: IdentityResolver,
    pub engine: DecisionEngine,
    pub admin: PolicyAdministration,
    /// Exposed routes, matched against request paths by the access middleware
    pub route_table: RouteTable,
    /// Present when the Prometheus recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the authorization services around one persistence backend.
    pub fn new(
        configuration: Configuration,
        persistence: Arc<dyn PersistenceService>,
        primary_role: Arc<PrimaryRoleResolver>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let route_table = RouteTable::new(&configuration.context_path());

        Self {
            identity: IdentityResolver::new(verifier, persistence.clone(), primary_role.clone()),
            engine: DecisionEngine::new(persistence.clone(), primary_role.clone()),
            admin: PolicyAdministration::new(persistence.clone(), primary_role.clone()),
            configuration,
            persistence,
            primary_role,
            route_table,
            metrics_handle: None,
        }
    }

    pub fn with_metrics_handle(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics_handle = handle;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("configuration", &self.configuration)
            .field("storage_mode", &self.persistence.storage_mode())
            .field("primary_role_fixed", &self.primary_role.is_fixed())
            .field("routes", &self.route_table.len())
            .field("metrics", &self.metrics_handle.is_some())
            .finish()
    }
}
