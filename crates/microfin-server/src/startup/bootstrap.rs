//! Startup provisioning: base permission catalog, route policy seeding and the
//! route consistency check.

use tracing::{info, warn};

use microfin_auth::ConsistencyReport;

use crate::model::AppState;

/// Seed base permissions and route policies, then compare the exposed routes
/// with the stored policies.
///
/// With `strict` set, an inconsistent store fails startup.
pub async fn provision(
    app_state: &AppState,
    seed_base_permissions: bool,
    strict: bool,
) -> anyhow::Result<ConsistencyReport> {
    if seed_base_permissions {
        let created = app_state.admin.seed_base_permissions().await?;
        if !created.is_empty() {
            info!("seeded {} base permissions", created.len());
        }
    }

    let registry = app_state.engine.registry();
    registry.seed(&app_state.route_table.seeds()).await?;

    let report = registry.verify(&app_state.route_table.keys()).await?;
    if !report.is_consistent() {
        let missing: Vec<String> = report.missing.iter().map(|k| k.to_string()).collect();
        let orphaned: Vec<String> = report.orphaned.iter().map(|k| k.to_string()).collect();

        if strict {
            anyhow::bail!(
                "route policy store is inconsistent: missing [{}], orphaned [{}]",
                missing.join(", "),
                orphaned.join(", ")
            );
        }

        if !missing.is_empty() {
            warn!("exposed routes without a policy: {}", missing.join(", "));
        }
        if !orphaned.is_empty() {
            warn!(
                "route policies for routes that are not exposed: {}",
                orphaned.join(", ")
            );
        }
    }

    Ok(report)
}
