//! Route policy persistence trait

use async_trait::async_trait;

use crate::model::{
    NewRoutePolicy, RouteConfigChanges, RouteConfigUpdate, RouteGrantWrite, RoutePolicyRecord,
};

#[async_trait]
pub trait RoutePersistence: Send + Sync {
    /// Find a route policy with its permission requirements
    async fn route_find(&self, route_key: &str) -> anyhow::Result<Option<RoutePolicyRecord>>;

    /// All route policies ordered by category, then route key
    async fn route_find_all(&self) -> anyhow::Result<Vec<RoutePolicyRecord>>;

    /// Key of the route using `name`, if any
    async fn route_find_key_by_name(&self, name: &str) -> anyhow::Result<Option<String>>;

    /// Insert a seed row; existing rows are left untouched. Returns true if inserted.
    async fn route_insert_if_absent(&self, route: NewRoutePolicy) -> anyhow::Result<bool>;

    /// Attach a permission; refused atomically for primary-only routes and
    /// permissions that no longer exist
    async fn route_grant_create(
        &self,
        route_key: &str,
        permission_id: &str,
    ) -> anyhow::Result<RouteGrantWrite>;

    async fn route_grant_delete(&self, route_key: &str, permission_id: &str)
    -> anyhow::Result<bool>;

    /// Apply configuration changes in one transaction. Turning primary-only on
    /// clears the route's grants in the same transaction.
    async fn route_update_config(
        &self,
        route_key: &str,
        changes: RouteConfigChanges,
    ) -> anyhow::Result<Option<RouteConfigUpdate>>;
}
