//! Route policy registry

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use microfin_common::RouteKey;
use microfin_persistence::{NewRoutePolicy, PersistenceService};

use crate::model::{ConsistencyReport, RouteCatalog, RoutePolicy, RouteSeed};

#[derive(Clone)]
pub struct RouteRegistry {
    persistence: Arc<dyn PersistenceService>,
}

impl RouteRegistry {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        Self { persistence }
    }

    /// Policy for a route key; `None` means the route is not configured
    pub async fn resolve(&self, key: &RouteKey) -> anyhow::Result<Option<RoutePolicy>> {
        match self.persistence.route_find(&key.to_string()).await? {
            Some(record) => Ok(Some(RoutePolicy::try_from(record)?)),
            None => Ok(None),
        }
    }

    /// All policies grouped by category, with aggregate statistics
    pub async fn list(&self) -> anyhow::Result<RouteCatalog> {
        let mut catalog = RouteCatalog::default();

        for record in self.persistence.route_find_all().await? {
            let policy = RoutePolicy::try_from(record)?;
            let stats = &mut catalog.stats;

            stats.total += 1;
            *stats
                .by_category
                .entry(policy.category_or_default().to_string())
                .or_default() += 1;
            if policy.only_primary_role {
                stats.only_primary_role += 1;
            } else {
                stats.delegable += 1;
                if policy.permissions.is_empty() {
                    stats.without_permissions += 1;
                }
            }
            if !policy.permissions.is_empty() {
                stats.with_permissions += 1;
            }

            catalog
                .grouped
                .entry(policy.category_or_default().to_string())
                .or_default()
                .push(policy);
        }

        Ok(catalog)
    }

    /// Insert a policy row for each seed that has none; existing rows are never
    /// modified. Returns the number of rows inserted.
    pub async fn seed(&self, seeds: &[RouteSeed]) -> anyhow::Result<usize> {
        let mut inserted = 0;

        for seed in seeds {
            if self
                .persistence
                .route_insert_if_absent(NewRoutePolicy::from(seed))
                .await?
            {
                inserted += 1;
            }
        }

        if inserted > 0 {
            info!("seeded {} route policies", inserted);
        }

        Ok(inserted)
    }

    /// Compare the exposed route set with stored policy rows
    pub async fn verify(&self, exposed: &[RouteKey]) -> anyhow::Result<ConsistencyReport> {
        let stored: BTreeSet<RouteKey> = self
            .persistence
            .route_find_all()
            .await?
            .into_iter()
            .filter_map(|record| match record.route_key.parse::<RouteKey>() {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!("skipping malformed route policy row: {}", e);
                    None
                }
            })
            .collect();
        let exposed: BTreeSet<RouteKey> = exposed.iter().cloned().collect();

        Ok(ConsistencyReport {
            missing: exposed.difference(&stored).cloned().collect(),
            orphaned: stored.difference(&exposed).cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microfin_persistence::{
        MemoryPersistService, NewPermission, PermissionPersistence, RoutePersistence,
    };

    fn seed(method: &str, path: &str, category: &'static str, only_primary_role: bool) -> RouteSeed {
        RouteSeed {
            key: RouteKey::new(method, path),
            name: "route",
            category,
            requires_auth: true,
            only_primary_role,
        }
    }

    #[tokio::test]
    async fn test_resolve_uses_normalized_key() {
        let store = Arc::new(MemoryPersistService::new());
        let registry = RouteRegistry::new(store);
        registry
            .seed(&[seed("GET", "/api/roles", "roles", false)])
            .await
            .unwrap();

        let policy = registry
            .resolve(&RouteKey::new("get", "/api/roles/"))
            .await
            .unwrap();
        assert!(policy.is_some());
        assert!(
            registry
                .resolve(&RouteKey::new("POST", "/api/roles"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_stats() {
        let store = Arc::new(MemoryPersistService::new());
        let registry = RouteRegistry::new(store.clone());
        registry
            .seed(&[
                seed("GET", "/api/roles", "roles", false),
                seed("POST", "/api/roles", "roles", false),
                seed("DELETE", "/api/permissions/{id}", "permissions", true),
            ])
            .await
            .unwrap();

        let view = store
            .permission_create(NewPermission {
                slug: "roles.view".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .route_grant_create("GET:/api/roles", &view.id)
            .await
            .unwrap();

        let catalog = registry.list().await.unwrap();
        assert_eq!(catalog.stats.total, 3);
        assert_eq!(catalog.stats.only_primary_role, 1);
        assert_eq!(catalog.stats.delegable, 2);
        assert_eq!(catalog.stats.with_permissions, 1);
        assert_eq!(catalog.stats.without_permissions, 1);
        assert_eq!(catalog.stats.by_category.get("roles"), Some(&2));
        assert_eq!(catalog.grouped["permissions"].len(), 1);
    }

    #[tokio::test]
    async fn test_seed_is_idempotent_and_verify_reports_drift() {
        let store = Arc::new(MemoryPersistService::new());
        let registry = RouteRegistry::new(store);
        let seeds = [
            seed("GET", "/api/roles", "roles", false),
            seed("GET", "/api/legacy", "legacy", false),
        ];
        assert_eq!(registry.seed(&seeds).await.unwrap(), 2);
        assert_eq!(registry.seed(&seeds).await.unwrap(), 0);

        let exposed = [
            RouteKey::new("GET", "/api/roles"),
            RouteKey::new("POST", "/api/roles"),
        ];
        let report = registry.verify(&exposed).await.unwrap();
        assert!(!report.is_consistent());
        assert_eq!(report.missing, vec![RouteKey::new("POST", "/api/roles")]);
        assert_eq!(report.orphaned, vec![RouteKey::new("GET", "/api/legacy")]);
    }
}
