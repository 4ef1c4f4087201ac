//! Main entry point for the microfin authorization server.

use std::sync::Arc;

use microfin_auth::{JwtTokenVerifier, PrimaryRoleResolver};
use microfin_persistence::{
    ExternalDbPersistService, MemoryPersistService, PersistenceService, StorageMode,
};
use microfin_server::{metrics, model::AppState, model::Configuration, startup};
use tracing::{error, info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new()?;
    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    let metrics_handle = if configuration.metrics_enabled() {
        let handle = metrics::install_prometheus_recorder()?;
        metrics::init_metrics();
        Some(handle)
    } else {
        None
    };

    let storage_mode = configuration.persistence_mode();
    info!("Persistence mode: {}", storage_mode);

    let persistence: Arc<dyn PersistenceService> = match storage_mode {
        StorageMode::ExternalDb => {
            let db = configuration.database_connection().await?;
            Arc::new(ExternalDbPersistService::new(db))
        }
        StorageMode::Memory => {
            warn!("No database configured, policies are kept in memory and lost on restart");
            Arc::new(MemoryPersistService::new())
        }
    };

    let primary_role = Arc::new(match configuration.primary_role_id() {
        Some(role_id) => {
            info!(role_id = %role_id, "Primary role pinned by configuration");
            PrimaryRoleResolver::fixed(Some(role_id))
        }
        None => PrimaryRoleResolver::from_store(
            persistence.clone(),
            configuration.primary_role_cache_ttl(),
        ),
    });

    let verifier = Arc::new(JwtTokenVerifier::from_base64_secret(
        &configuration.token_secret()?,
        configuration.token_leeway_seconds(),
    )?);

    let seed_base_permissions = configuration.seed_base_permissions();
    let strict = configuration.route_check_strict();
    let context_path = configuration.context_path();
    let address = configuration.server_address();
    let port = configuration.server_port();

    let app_state = Arc::new(
        AppState::new(configuration, persistence, primary_role, verifier)
            .with_metrics_handle(metrics_handle),
    );

    let report = startup::provision(&app_state, seed_base_permissions, strict).await?;
    info!(
        routes = app_state.route_table.len(),
        missing = report.missing.len(),
        orphaned = report.orphaned.len(),
        "Route policies provisioned"
    );

    info!("Starting HTTP server on {}:{}{}", address, port, context_path);
    let server = startup::main_server(app_state, context_path, address, port)?;
    let handle = server.handle();

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
                return Err(e.into());
            }
        }
        _ = startup::wait_for_shutdown_signal() => {
            handle.stop(true).await;
        }
    }

    info!("Server stopped");
    Ok(())
}
