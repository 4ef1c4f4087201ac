//! In-process persistence backend
//!
//! Keeps the whole authorization schema behind one `RwLock`, so every trait
//! operation observes and mutates a single consistent snapshot. Used for
//! standalone development and for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::RwLock;

use crate::model::*;
use crate::traits::*;

#[derive(Clone, Debug)]
struct AccountRow {
    status: String,
    role_id: Option<String>,
    deleted: bool,
}

#[derive(Clone, Debug)]
struct RouteRow {
    policy: NewRoutePolicy,
    updated_at: NaiveDateTime,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, AccountRow>,
    roles: HashMap<String, RoleInfo>,
    permissions: HashMap<String, PermissionInfo>,
    role_grants: BTreeSet<(String, String)>,
    user_grants: BTreeSet<(String, String)>,
    routes: BTreeMap<String, RouteRow>,
    route_grants: BTreeSet<(String, String)>,
    config: HashMap<String, String>,
    audit: Vec<AuditEntry>,
}

impl MemoryState {
    fn route_record(&self, key: &str, row: &RouteRow) -> RoutePolicyRecord {
        let mut permissions: Vec<PermissionInfo> = self
            .route_grants
            .iter()
            .filter(|(route_key, _)| route_key == key)
            .filter_map(|(_, permission_id)| self.permissions.get(permission_id).cloned())
            .collect();
        permissions.sort_by(|a, b| a.slug.cmp(&b.slug));

        let policy = &row.policy;
        RoutePolicyRecord {
            route_key: key.to_string(),
            method: policy.method.clone(),
            path: policy.path.clone(),
            route_name: policy.route_name.clone(),
            route_description: policy.route_description.clone(),
            category: policy.category.clone(),
            requires_auth: policy.requires_auth,
            only_primary_role: policy.only_primary_role,
            permissions,
        }
    }

    fn usage(&self, permission_id: &str) -> UsageCounts {
        UsageCounts {
            roles: self
                .role_grants
                .iter()
                .filter(|(_, p)| p == permission_id)
                .count() as u64,
            users: self
                .user_grants
                .iter()
                .filter(|(_, p)| p == permission_id)
                .count() as u64,
            routes: self
                .route_grants
                .iter()
                .filter(|(_, p)| p == permission_id)
                .count() as u64,
        }
    }
}

fn category_order(p: &PermissionInfo) -> (String, String) {
    (p.category.clone().unwrap_or_default(), p.slug.clone())
}

/// In-memory persistence service
#[derive(Default)]
pub struct MemoryPersistService {
    state: RwLock<MemoryState>,
    fail_audit: AtomicBool,
}

impl MemoryPersistService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a role
    pub fn put_role(&self, id: &str, name: &str) {
        self.state.write().roles.insert(
            id.to_string(),
            RoleInfo {
                id: id.to_string(),
                name: name.to_string(),
                description: None,
            },
        );
    }

    /// Insert or replace an account
    pub fn put_account(&self, id: &str, status: &str, role_id: Option<&str>) {
        self.state.write().accounts.insert(
            id.to_string(),
            AccountRow {
                status: status.to_string(),
                role_id: role_id.map(str::to_string),
                deleted: false,
            },
        );
    }

    /// Mark an account as soft-deleted
    pub fn soft_delete_account(&self, id: &str) {
        if let Some(account) = self.state.write().accounts.get_mut(id) {
            account.deleted = true;
        }
    }

    /// Make subsequent audit writes fail, simulating an unavailable sink
    pub fn set_audit_failure(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all audit entries written so far
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.read().audit.clone()
    }
}

#[async_trait]
impl PersistenceService for MemoryPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Memory
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl AccountPersistence for MemoryPersistService {
    async fn account_find_by_id(&self, id: &str) -> anyhow::Result<Option<AccountInfo>> {
        let state = self.state.read();

        Ok(state.accounts.get(id).map(|row| AccountInfo {
            id: id.to_string(),
            status: row.status.clone(),
            deleted: row.deleted,
            role: row
                .role_id
                .as_ref()
                .and_then(|role_id| state.roles.get(role_id).cloned()),
        }))
    }

    async fn role_find_by_id(&self, id: &str) -> anyhow::Result<Option<RoleInfo>> {
        Ok(self.state.read().roles.get(id).cloned())
    }

    async fn role_find_by_names(&self, names: &[String]) -> anyhow::Result<Vec<RoleInfo>> {
        let state = self.state.read();
        let mut roles: Vec<RoleInfo> = state
            .roles
            .values()
            .filter(|r| names.contains(&r.name))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(roles)
    }
}

#[async_trait]
impl PermissionPersistence for MemoryPersistService {
    async fn permission_find_by_id(&self, id: &str) -> anyhow::Result<Option<PermissionInfo>> {
        Ok(self.state.read().permissions.get(id).cloned())
    }

    async fn permission_find_by_slug(&self, slug: &str) -> anyhow::Result<Option<PermissionInfo>> {
        Ok(self
            .state
            .read()
            .permissions
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn permission_find_by_slugs(
        &self,
        slugs: &[String],
    ) -> anyhow::Result<Vec<PermissionInfo>> {
        let mut found: Vec<PermissionInfo> = self
            .state
            .read()
            .permissions
            .values()
            .filter(|p| slugs.contains(&p.slug))
            .cloned()
            .collect();
        found.sort_by_key(category_order);

        Ok(found)
    }

    async fn permission_find_all(&self) -> anyhow::Result<Vec<PermissionInfo>> {
        let mut all: Vec<PermissionInfo> =
            self.state.read().permissions.values().cloned().collect();
        all.sort_by_key(category_order);

        Ok(all)
    }

    async fn permission_usage_counts(&self) -> anyhow::Result<HashMap<String, UsageCounts>> {
        let state = self.state.read();

        Ok(state
            .permissions
            .keys()
            .map(|id| (id.clone(), state.usage(id)))
            .collect())
    }

    async fn permission_create(&self, permission: NewPermission) -> anyhow::Result<PermissionInfo> {
        let mut state = self.state.write();

        if state.permissions.values().any(|p| p.slug == permission.slug) {
            anyhow::bail!(
                "unique constraint violated: permissions.slug '{}'",
                permission.slug
            );
        }

        let now = chrono::Local::now().naive_local();
        let info = PermissionInfo {
            id: uuid::Uuid::new_v4().to_string(),
            slug: permission.slug,
            description: permission.description,
            category: permission.category,
            created_at: now,
            updated_at: now,
        };
        state.permissions.insert(info.id.clone(), info.clone());

        Ok(info)
    }

    async fn permission_update(
        &self,
        id: &str,
        changes: PermissionChanges,
    ) -> anyhow::Result<Option<PermissionInfo>> {
        let mut state = self.state.write();

        if let Some(slug) = &changes.slug
            && state.permissions.values().any(|p| &p.slug == slug && p.id != id)
        {
            anyhow::bail!("unique constraint violated: permissions.slug '{}'", slug);
        }

        let Some(permission) = state.permissions.get_mut(id) else {
            return Ok(None);
        };

        if let Some(slug) = changes.slug {
            permission.slug = slug;
        }
        if let Some(description) = changes.description {
            permission.description = Some(description);
        }
        if let Some(category) = changes.category {
            permission.category = Some(category);
        }
        permission.updated_at = chrono::Local::now().naive_local();

        Ok(Some(permission.clone()))
    }

    async fn permission_delete_if_unused(&self, id: &str) -> anyhow::Result<PermissionDeletion> {
        let mut state = self.state.write();

        if !state.permissions.contains_key(id) {
            return Ok(PermissionDeletion::NotFound);
        }

        let usage = state.usage(id);
        if !usage.is_unused() {
            return Ok(PermissionDeletion::InUse(usage));
        }

        Ok(state
            .permissions
            .remove(id)
            .map(PermissionDeletion::Deleted)
            .unwrap_or(PermissionDeletion::NotFound))
    }

    async fn permission_detail(&self, id: &str) -> anyhow::Result<Option<PermissionDetail>> {
        let state = self.state.read();

        let Some(permission) = state.permissions.get(id).cloned() else {
            return Ok(None);
        };

        let mut roles: Vec<RoleInfo> = state
            .role_grants
            .iter()
            .filter(|(_, p)| p == id)
            .filter_map(|(role_id, _)| state.roles.get(role_id).cloned())
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));

        let user_ids = state
            .user_grants
            .iter()
            .filter(|(_, p)| p == id)
            .map(|(user_id, _)| user_id.clone())
            .collect();

        let route_keys = state
            .route_grants
            .iter()
            .filter(|(_, p)| p == id)
            .map(|(route_key, _)| route_key.clone())
            .collect();

        Ok(Some(PermissionDetail {
            permission,
            roles,
            user_ids,
            route_keys,
        }))
    }
}

#[async_trait]
impl GrantPersistence for MemoryPersistService {
    async fn grant_find_slugs(
        &self,
        sources: &[GrantSource],
        among: Option<&[String]>,
    ) -> anyhow::Result<BTreeSet<String>> {
        let state = self.state.read();

        let slugs = sources
            .iter()
            .flat_map(|source| {
                let (grants, owner) = match source {
                    GrantSource::Role(role_id) => (&state.role_grants, role_id),
                    GrantSource::User(user_id) => (&state.user_grants, user_id),
                };
                grants
                    .iter()
                    .filter(move |(o, _)| o == owner)
                    .map(|(_, permission_id)| permission_id)
            })
            .filter_map(|permission_id| state.permissions.get(permission_id))
            .map(|p| p.slug.clone())
            .filter(|slug| among.is_none_or(|among| among.contains(slug)))
            .collect();

        Ok(slugs)
    }

    async fn role_grant_find_by_role(&self, role_id: &str) -> anyhow::Result<Vec<PermissionInfo>> {
        let state = self.state.read();
        let mut permissions: Vec<PermissionInfo> = state
            .role_grants
            .iter()
            .filter(|(r, _)| r == role_id)
            .filter_map(|(_, p)| state.permissions.get(p).cloned())
            .collect();
        permissions.sort_by_key(category_order);

        Ok(permissions)
    }

    async fn role_grant_create(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> anyhow::Result<GrantWrite> {
        let mut state = self.state.write();

        if !state.permissions.contains_key(permission_id) {
            return Ok(GrantWrite::PermissionMissing);
        }

        let inserted = state
            .role_grants
            .insert((role_id.to_string(), permission_id.to_string()));

        Ok(if inserted {
            GrantWrite::Created
        } else {
            GrantWrite::AlreadyExists
        })
    }

    async fn role_grant_delete(&self, role_id: &str, permission_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .state
            .write()
            .role_grants
            .remove(&(role_id.to_string(), permission_id.to_string())))
    }

    async fn role_grant_create_many(
        &self,
        role_id: &str,
        permission_ids: &[String],
    ) -> anyhow::Result<GrantBatchWrite> {
        let mut state = self.state.write();

        if let Some(missing) = permission_ids
            .iter()
            .find(|p| !state.permissions.contains_key(*p))
        {
            return Ok(GrantBatchWrite::PermissionMissing(missing.clone()));
        }

        Ok(GrantBatchWrite::Created(
            permission_ids
                .iter()
                .filter(|p| {
                    state
                        .role_grants
                        .insert((role_id.to_string(), p.to_string()))
                })
                .cloned()
                .collect(),
        ))
    }

    async fn role_grant_delete_many(
        &self,
        role_id: &str,
        permission_ids: &[String],
    ) -> anyhow::Result<Vec<String>> {
        let mut state = self.state.write();

        Ok(permission_ids
            .iter()
            .filter(|p| {
                state
                    .role_grants
                    .remove(&(role_id.to_string(), p.to_string()))
            })
            .cloned()
            .collect())
    }

    async fn user_grant_create(
        &self,
        user_id: &str,
        permission_id: &str,
    ) -> anyhow::Result<GrantWrite> {
        let mut state = self.state.write();

        if !state.permissions.contains_key(permission_id) {
            return Ok(GrantWrite::PermissionMissing);
        }

        let inserted = state
            .user_grants
            .insert((user_id.to_string(), permission_id.to_string()));

        Ok(if inserted {
            GrantWrite::Created
        } else {
            GrantWrite::AlreadyExists
        })
    }

    async fn user_grant_delete(&self, user_id: &str, permission_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .state
            .write()
            .user_grants
            .remove(&(user_id.to_string(), permission_id.to_string())))
    }
}

#[async_trait]
impl RoutePersistence for MemoryPersistService {
    async fn route_find(&self, route_key: &str) -> anyhow::Result<Option<RoutePolicyRecord>> {
        let state = self.state.read();

        Ok(state
            .routes
            .get(route_key)
            .map(|row| state.route_record(route_key, row)))
    }

    async fn route_find_all(&self) -> anyhow::Result<Vec<RoutePolicyRecord>> {
        let state = self.state.read();
        let mut records: Vec<RoutePolicyRecord> = state
            .routes
            .iter()
            .map(|(key, row)| state.route_record(key, row))
            .collect();
        records.sort_by(|a, b| {
            (a.category.as_deref().unwrap_or_default(), &a.route_key)
                .cmp(&(b.category.as_deref().unwrap_or_default(), &b.route_key))
        });

        Ok(records)
    }

    async fn route_find_key_by_name(&self, name: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .state
            .read()
            .routes
            .iter()
            .find(|(_, row)| row.policy.route_name.as_deref() == Some(name))
            .map(|(key, _)| key.clone()))
    }

    async fn route_insert_if_absent(&self, route: NewRoutePolicy) -> anyhow::Result<bool> {
        let mut state = self.state.write();

        if state.routes.contains_key(&route.route_key) {
            return Ok(false);
        }

        state.routes.insert(
            route.route_key.clone(),
            RouteRow {
                policy: route,
                updated_at: chrono::Local::now().naive_local(),
            },
        );

        Ok(true)
    }

    async fn route_grant_create(
        &self,
        route_key: &str,
        permission_id: &str,
    ) -> anyhow::Result<RouteGrantWrite> {
        let mut state = self.state.write();

        let Some(row) = state.routes.get(route_key) else {
            return Ok(RouteGrantWrite::RouteMissing);
        };
        if row.policy.only_primary_role {
            return Ok(RouteGrantWrite::PrimaryOnly);
        }
        if !state.permissions.contains_key(permission_id) {
            return Ok(RouteGrantWrite::PermissionMissing);
        }

        let inserted = state
            .route_grants
            .insert((route_key.to_string(), permission_id.to_string()));

        Ok(if inserted {
            RouteGrantWrite::Created
        } else {
            RouteGrantWrite::AlreadyExists
        })
    }

    async fn route_grant_delete(
        &self,
        route_key: &str,
        permission_id: &str,
    ) -> anyhow::Result<bool> {
        Ok(self
            .state
            .write()
            .route_grants
            .remove(&(route_key.to_string(), permission_id.to_string())))
    }

    async fn route_update_config(
        &self,
        route_key: &str,
        changes: RouteConfigChanges,
    ) -> anyhow::Result<Option<RouteConfigUpdate>> {
        let mut state = self.state.write();

        let Some(row) = state.routes.get(route_key).cloned() else {
            return Ok(None);
        };
        let before = state.route_record(route_key, &row);

        let mut updated = row;
        if let Some(name) = changes.route_name {
            updated.policy.route_name = Some(name);
        }
        if let Some(description) = changes.route_description {
            updated.policy.route_description = Some(description);
        }
        if let Some(only_primary_role) = changes.only_primary_role {
            updated.policy.only_primary_role = only_primary_role;
        }
        updated.updated_at = chrono::Local::now().naive_local();

        let cleared_grants = if updated.policy.only_primary_role {
            state.route_grants.retain(|(key, _)| key != route_key);
            before.permissions.clone()
        } else {
            Vec::new()
        };

        state.routes.insert(route_key.to_string(), updated.clone());
        let after = state.route_record(route_key, &updated);

        Ok(Some(RouteConfigUpdate {
            before,
            after,
            cleared_grants,
        }))
    }
}

#[async_trait]
impl SystemConfigPersistence for MemoryPersistService {
    async fn config_get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.state.read().config.get(key).cloned())
    }

    async fn config_set_if_absent(&self, key: &str, value: &str) -> anyhow::Result<bool> {
        let mut state = self.state.write();

        if state.config.contains_key(key) {
            return Ok(false);
        }
        state.config.insert(key.to_string(), value.to_string());

        Ok(true)
    }
}

#[async_trait]
impl AuditPersistence for MemoryPersistService {
    async fn audit_append(&self, entry: AuditEntry) -> anyhow::Result<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            anyhow::bail!("audit sink unavailable");
        }

        self.state.write().audit.push(entry);

        Ok(())
    }
}
