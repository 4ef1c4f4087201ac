//! SQL-based persistence backend (MySQL/PostgreSQL via SeaORM)
//!
//! Multi-row invariants (delete-if-unused, primary-only toggles, check-then-insert
//! grants) run inside a single transaction with the owning row locked.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use sea_orm::{prelude::Expr, sea_query::Asterisk, *};

use crate::entity::{
    audit_log, permissions, role_permissions, roles, route_permission_map, route_permissions,
    system_config, user_permissions, users,
};
use crate::model::*;
use crate::traits::*;

/// External database persistence service
///
/// Wraps a SeaORM `DatabaseConnection` and implements all persistence traits
/// by direct database queries.
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl From<permissions::Model> for PermissionInfo {
    fn from(m: permissions::Model) -> Self {
        PermissionInfo {
            id: m.id,
            slug: m.slug,
            description: m.description,
            category: m.category,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<roles::Model> for RoleInfo {
    fn from(m: roles::Model) -> Self {
        RoleInfo {
            id: m.id,
            name: m.name,
            description: m.description,
        }
    }
}

fn route_record(m: route_permission_map::Model, permissions: Vec<PermissionInfo>) -> RoutePolicyRecord {
    RoutePolicyRecord {
        route_key: m.route_key,
        method: m.method,
        path: m.path,
        route_name: m.route_name,
        route_description: m.route_description,
        category: m.category,
        requires_auth: m.requires_auth,
        only_primary_role: m.only_primary_role,
        permissions,
    }
}

/// Share-lock a permission row for the rest of the transaction. A concurrent
/// delete-if-unused holds the exclusive lock, so it either sees the grant or
/// the grant sees the row gone.
async fn permission_locked(tx: &DatabaseTransaction, id: &str) -> anyhow::Result<bool> {
    Ok(permissions::Entity::find_by_id(id)
        .lock_shared()
        .one(tx)
        .await?
        .is_some())
}

async fn route_permissions_of<C: ConnectionTrait>(
    conn: &C,
    route_key: &str,
) -> anyhow::Result<Vec<PermissionInfo>> {
    let permissions = permissions::Entity::find()
        .filter(
            permissions::Column::Id.in_subquery(
                route_permissions::Entity::find()
                    .select_only()
                    .column(route_permissions::Column::PermissionId)
                    .filter(route_permissions::Column::RouteKey.eq(route_key))
                    .into_query(),
            ),
        )
        .order_by_asc(permissions::Column::Slug)
        .all(conn)
        .await?
        .into_iter()
        .map(PermissionInfo::from)
        .collect();

    Ok(permissions)
}

async fn usage_of<C: ConnectionTrait>(conn: &C, permission_id: &str) -> anyhow::Result<UsageCounts> {
    let roles = role_permissions::Entity::find()
        .filter(role_permissions::Column::PermissionId.eq(permission_id))
        .count(conn)
        .await?;
    let users = user_permissions::Entity::find()
        .filter(user_permissions::Column::PermissionId.eq(permission_id))
        .count(conn)
        .await?;
    let routes = route_permissions::Entity::find()
        .filter(route_permissions::Column::PermissionId.eq(permission_id))
        .count(conn)
        .await?;

    Ok(UsageCounts {
        roles,
        users,
        routes,
    })
}

// ============================================================================
// PersistenceService implementation
// ============================================================================

#[async_trait]
impl PersistenceService for ExternalDbPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        // Execute a simple query to verify connectivity
        permissions::Entity::find()
            .select_only()
            .column_as(Expr::cust("1"), "health")
            .into_tuple::<i32>()
            .one(&self.db)
            .await?;
        Ok(())
    }
}

// ============================================================================
// AccountPersistence implementation
// ============================================================================

#[async_trait]
impl AccountPersistence for ExternalDbPersistService {
    async fn account_find_by_id(&self, id: &str) -> anyhow::Result<Option<AccountInfo>> {
        let Some(user) = users::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let role = match &user.role_id {
            Some(role_id) => roles::Entity::find_by_id(role_id.as_str())
                .one(&self.db)
                .await?
                .map(RoleInfo::from),
            None => None,
        };

        Ok(Some(AccountInfo {
            id: user.id,
            status: user.status,
            deleted: user.deleted_at.is_some(),
            role,
        }))
    }

    async fn role_find_by_id(&self, id: &str) -> anyhow::Result<Option<RoleInfo>> {
        Ok(roles::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(RoleInfo::from))
    }

    async fn role_find_by_names(&self, names: &[String]) -> anyhow::Result<Vec<RoleInfo>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let roles = roles::Entity::find()
            .filter(roles::Column::Name.is_in(names.iter().map(String::as_str)))
            .order_by_asc(roles::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(RoleInfo::from)
            .collect();

        Ok(roles)
    }
}

// ============================================================================
// PermissionPersistence implementation
// ============================================================================

#[async_trait]
impl PermissionPersistence for ExternalDbPersistService {
    async fn permission_find_by_id(&self, id: &str) -> anyhow::Result<Option<PermissionInfo>> {
        Ok(permissions::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(PermissionInfo::from))
    }

    async fn permission_find_by_slug(&self, slug: &str) -> anyhow::Result<Option<PermissionInfo>> {
        Ok(permissions::Entity::find()
            .filter(permissions::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .map(PermissionInfo::from))
    }

    async fn permission_find_by_slugs(
        &self,
        slugs: &[String],
    ) -> anyhow::Result<Vec<PermissionInfo>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let found = permissions::Entity::find()
            .filter(permissions::Column::Slug.is_in(slugs.iter().map(String::as_str)))
            .order_by_asc(permissions::Column::Category)
            .order_by_asc(permissions::Column::Slug)
            .all(&self.db)
            .await?
            .into_iter()
            .map(PermissionInfo::from)
            .collect();

        Ok(found)
    }

    async fn permission_find_all(&self) -> anyhow::Result<Vec<PermissionInfo>> {
        let all = permissions::Entity::find()
            .order_by_asc(permissions::Column::Category)
            .order_by_asc(permissions::Column::Slug)
            .all(&self.db)
            .await?
            .into_iter()
            .map(PermissionInfo::from)
            .collect();

        Ok(all)
    }

    async fn permission_usage_counts(&self) -> anyhow::Result<HashMap<String, UsageCounts>> {
        let mut counts: HashMap<String, UsageCounts> = HashMap::new();

        let role_counts = role_permissions::Entity::find()
            .select_only()
            .column(role_permissions::Column::PermissionId)
            .column_as(Expr::col(Asterisk).count(), "count")
            .group_by(role_permissions::Column::PermissionId)
            .into_tuple::<(String, i64)>()
            .all(&self.db)
            .await?;
        for (id, count) in role_counts {
            counts.entry(id).or_default().roles = count as u64;
        }

        let user_counts = user_permissions::Entity::find()
            .select_only()
            .column(user_permissions::Column::PermissionId)
            .column_as(Expr::col(Asterisk).count(), "count")
            .group_by(user_permissions::Column::PermissionId)
            .into_tuple::<(String, i64)>()
            .all(&self.db)
            .await?;
        for (id, count) in user_counts {
            counts.entry(id).or_default().users = count as u64;
        }

        let route_counts = route_permissions::Entity::find()
            .select_only()
            .column(route_permissions::Column::PermissionId)
            .column_as(Expr::col(Asterisk).count(), "count")
            .group_by(route_permissions::Column::PermissionId)
            .into_tuple::<(String, i64)>()
            .all(&self.db)
            .await?;
        for (id, count) in route_counts {
            counts.entry(id).or_default().routes = count as u64;
        }

        Ok(counts)
    }

    async fn permission_create(&self, permission: NewPermission) -> anyhow::Result<PermissionInfo> {
        let now = chrono::Local::now().naive_local();
        let model = permissions::Model {
            id: uuid::Uuid::new_v4().to_string(),
            slug: permission.slug,
            description: permission.description,
            category: permission.category,
            created_at: now,
            updated_at: now,
        };

        permissions::Entity::insert(permissions::ActiveModel {
            id: Set(model.id.clone()),
            slug: Set(model.slug.clone()),
            description: Set(model.description.clone()),
            category: Set(model.category.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .exec_without_returning(&self.db)
        .await?;

        Ok(model.into())
    }

    async fn permission_update(
        &self,
        id: &str,
        changes: PermissionChanges,
    ) -> anyhow::Result<Option<PermissionInfo>> {
        let Some(existing) = permissions::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: permissions::ActiveModel = existing.into();
        if let Some(slug) = changes.slug {
            active.slug = Set(slug);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(category) = changes.category {
            active.category = Set(Some(category));
        }
        active.updated_at = Set(chrono::Local::now().naive_local());

        Ok(Some(active.update(&self.db).await?.into()))
    }

    async fn permission_delete_if_unused(&self, id: &str) -> anyhow::Result<PermissionDeletion> {
        let tx = self.db.begin().await?;

        let Some(existing) = permissions::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&tx)
            .await?
        else {
            return Ok(PermissionDeletion::NotFound);
        };

        let usage = usage_of(&tx, id).await?;
        if !usage.is_unused() {
            return Ok(PermissionDeletion::InUse(usage));
        }

        permissions::Entity::delete_by_id(id).exec(&tx).await?;
        tx.commit().await?;

        tracing::debug!(permission_id = id, "permission deleted");

        Ok(PermissionDeletion::Deleted(existing.into()))
    }

    async fn permission_detail(&self, id: &str) -> anyhow::Result<Option<PermissionDetail>> {
        let Some(permission) = permissions::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let roles = roles::Entity::find()
            .filter(
                roles::Column::Id.in_subquery(
                    role_permissions::Entity::find()
                        .select_only()
                        .column(role_permissions::Column::RoleId)
                        .filter(role_permissions::Column::PermissionId.eq(id))
                        .into_query(),
                ),
            )
            .order_by_asc(roles::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(RoleInfo::from)
            .collect();

        let user_ids = user_permissions::Entity::find()
            .select_only()
            .column(user_permissions::Column::UserId)
            .filter(user_permissions::Column::PermissionId.eq(id))
            .order_by_asc(user_permissions::Column::UserId)
            .into_tuple::<String>()
            .all(&self.db)
            .await?;

        let route_keys = route_permissions::Entity::find()
            .select_only()
            .column(route_permissions::Column::RouteKey)
            .filter(route_permissions::Column::PermissionId.eq(id))
            .order_by_asc(route_permissions::Column::RouteKey)
            .into_tuple::<String>()
            .all(&self.db)
            .await?;

        Ok(Some(PermissionDetail {
            permission: permission.into(),
            roles,
            user_ids,
            route_keys,
        }))
    }
}

// ============================================================================
// GrantPersistence implementation
// ============================================================================

#[async_trait]
impl GrantPersistence for ExternalDbPersistService {
    async fn grant_find_slugs(
        &self,
        sources: &[GrantSource],
        among: Option<&[String]>,
    ) -> anyhow::Result<BTreeSet<String>> {
        if sources.is_empty() || among.is_some_and(|among| among.is_empty()) {
            return Ok(BTreeSet::new());
        }

        let mut granted = Condition::any();
        for source in sources {
            granted = match source {
                GrantSource::Role(role_id) => granted.add(
                    permissions::Column::Id.in_subquery(
                        role_permissions::Entity::find()
                            .select_only()
                            .column(role_permissions::Column::PermissionId)
                            .filter(role_permissions::Column::RoleId.eq(role_id.as_str()))
                            .into_query(),
                    ),
                ),
                GrantSource::User(user_id) => granted.add(
                    permissions::Column::Id.in_subquery(
                        user_permissions::Entity::find()
                            .select_only()
                            .column(user_permissions::Column::PermissionId)
                            .filter(user_permissions::Column::UserId.eq(user_id.as_str()))
                            .into_query(),
                    ),
                ),
            };
        }

        let mut select = permissions::Entity::find()
            .select_only()
            .column(permissions::Column::Slug)
            .filter(granted);

        if let Some(among) = among {
            select = select.filter(permissions::Column::Slug.is_in(among.iter().map(String::as_str)));
        }

        let slugs = select.into_tuple::<String>().all(&self.db).await?;

        Ok(slugs.into_iter().collect())
    }

    async fn role_grant_find_by_role(&self, role_id: &str) -> anyhow::Result<Vec<PermissionInfo>> {
        let permissions = permissions::Entity::find()
            .filter(
                permissions::Column::Id.in_subquery(
                    role_permissions::Entity::find()
                        .select_only()
                        .column(role_permissions::Column::PermissionId)
                        .filter(role_permissions::Column::RoleId.eq(role_id))
                        .into_query(),
                ),
            )
            .order_by_asc(permissions::Column::Category)
            .order_by_asc(permissions::Column::Slug)
            .all(&self.db)
            .await?
            .into_iter()
            .map(PermissionInfo::from)
            .collect();

        Ok(permissions)
    }

    async fn role_grant_create(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> anyhow::Result<GrantWrite> {
        let tx = self.db.begin().await?;

        if !permission_locked(&tx, permission_id).await? {
            return Ok(GrantWrite::PermissionMissing);
        }

        let existing = role_permissions::Entity::find_by_id((
            role_id.to_string(),
            permission_id.to_string(),
        ))
        .one(&tx)
        .await?;
        if existing.is_some() {
            return Ok(GrantWrite::AlreadyExists);
        }

        role_permissions::Entity::insert(role_permissions::ActiveModel {
            role_id: Set(role_id.to_string()),
            permission_id: Set(permission_id.to_string()),
            created_at: Set(chrono::Local::now().naive_local()),
        })
        .exec_without_returning(&tx)
        .await?;
        tx.commit().await?;

        Ok(GrantWrite::Created)
    }

    async fn role_grant_delete(&self, role_id: &str, permission_id: &str) -> anyhow::Result<bool> {
        let result =
            role_permissions::Entity::delete_by_id((role_id.to_string(), permission_id.to_string()))
                .exec(&self.db)
                .await?;

        Ok(result.rows_affected > 0)
    }

    async fn role_grant_create_many(
        &self,
        role_id: &str,
        permission_ids: &[String],
    ) -> anyhow::Result<GrantBatchWrite> {
        if permission_ids.is_empty() {
            return Ok(GrantBatchWrite::Created(Vec::new()));
        }

        let tx = self.db.begin().await?;

        let found: HashSet<String> = permissions::Entity::find()
            .select_only()
            .column(permissions::Column::Id)
            .filter(permissions::Column::Id.is_in(permission_ids.iter().map(String::as_str)))
            .lock_shared()
            .into_tuple::<String>()
            .all(&tx)
            .await?
            .into_iter()
            .collect();
        if let Some(missing) = permission_ids.iter().find(|id| !found.contains(*id)) {
            return Ok(GrantBatchWrite::PermissionMissing(missing.clone()));
        }

        let existing: HashSet<String> = role_permissions::Entity::find()
            .select_only()
            .column(role_permissions::Column::PermissionId)
            .filter(role_permissions::Column::RoleId.eq(role_id))
            .filter(
                role_permissions::Column::PermissionId
                    .is_in(permission_ids.iter().map(String::as_str)),
            )
            .into_tuple::<String>()
            .all(&tx)
            .await?
            .into_iter()
            .collect();

        let mut seen = HashSet::new();
        let created: Vec<String> = permission_ids
            .iter()
            .filter(|id| !existing.contains(*id) && seen.insert(id.as_str()))
            .cloned()
            .collect();

        if !created.is_empty() {
            let now = chrono::Local::now().naive_local();
            let rows = created.iter().map(|permission_id| role_permissions::ActiveModel {
                role_id: Set(role_id.to_string()),
                permission_id: Set(permission_id.clone()),
                created_at: Set(now),
            });
            role_permissions::Entity::insert_many(rows)
                .exec_without_returning(&tx)
                .await?;
        }
        tx.commit().await?;

        Ok(GrantBatchWrite::Created(created))
    }

    async fn role_grant_delete_many(
        &self,
        role_id: &str,
        permission_ids: &[String],
    ) -> anyhow::Result<Vec<String>> {
        if permission_ids.is_empty() {
            return Ok(Vec::new());
        }

        let tx = self.db.begin().await?;

        let removed = role_permissions::Entity::find()
            .select_only()
            .column(role_permissions::Column::PermissionId)
            .filter(role_permissions::Column::RoleId.eq(role_id))
            .filter(
                role_permissions::Column::PermissionId
                    .is_in(permission_ids.iter().map(String::as_str)),
            )
            .into_tuple::<String>()
            .all(&tx)
            .await?;

        if !removed.is_empty() {
            role_permissions::Entity::delete_many()
                .filter(role_permissions::Column::RoleId.eq(role_id))
                .filter(role_permissions::Column::PermissionId.is_in(removed.iter().map(String::as_str)))
                .exec(&tx)
                .await?;
        }
        tx.commit().await?;

        Ok(removed)
    }

    async fn user_grant_create(
        &self,
        user_id: &str,
        permission_id: &str,
    ) -> anyhow::Result<GrantWrite> {
        let tx = self.db.begin().await?;

        if !permission_locked(&tx, permission_id).await? {
            return Ok(GrantWrite::PermissionMissing);
        }

        let existing = user_permissions::Entity::find_by_id((
            user_id.to_string(),
            permission_id.to_string(),
        ))
        .one(&tx)
        .await?;
        if existing.is_some() {
            return Ok(GrantWrite::AlreadyExists);
        }

        user_permissions::Entity::insert(user_permissions::ActiveModel {
            user_id: Set(user_id.to_string()),
            permission_id: Set(permission_id.to_string()),
            created_at: Set(chrono::Local::now().naive_local()),
        })
        .exec_without_returning(&tx)
        .await?;
        tx.commit().await?;

        Ok(GrantWrite::Created)
    }

    async fn user_grant_delete(&self, user_id: &str, permission_id: &str) -> anyhow::Result<bool> {
        let result =
            user_permissions::Entity::delete_by_id((user_id.to_string(), permission_id.to_string()))
                .exec(&self.db)
                .await?;

        Ok(result.rows_affected > 0)
    }
}

// ============================================================================
// RoutePersistence implementation
// ============================================================================

#[async_trait]
impl RoutePersistence for ExternalDbPersistService {
    async fn route_find(&self, route_key: &str) -> anyhow::Result<Option<RoutePolicyRecord>> {
        let Some(route) = route_permission_map::Entity::find_by_id(route_key)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let permissions = route_permissions_of(&self.db, route_key).await?;

        Ok(Some(route_record(route, permissions)))
    }

    async fn route_find_all(&self) -> anyhow::Result<Vec<RoutePolicyRecord>> {
        let routes = route_permission_map::Entity::find()
            .order_by_asc(route_permission_map::Column::Category)
            .order_by_asc(route_permission_map::Column::RouteKey)
            .all(&self.db)
            .await?;

        let grants = route_permissions::Entity::find().all(&self.db).await?;

        let permissions: HashMap<String, PermissionInfo> = permissions::Entity::find()
            .filter(
                permissions::Column::Id.in_subquery(
                    route_permissions::Entity::find()
                        .select_only()
                        .column(route_permissions::Column::PermissionId)
                        .into_query(),
                ),
            )
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), PermissionInfo::from(m)))
            .collect();

        let mut by_route: HashMap<String, Vec<PermissionInfo>> = HashMap::new();
        for grant in grants {
            if let Some(permission) = permissions.get(&grant.permission_id) {
                by_route
                    .entry(grant.route_key)
                    .or_default()
                    .push(permission.clone());
            }
        }

        let records = routes
            .into_iter()
            .map(|route| {
                let mut granted = by_route.remove(&route.route_key).unwrap_or_default();
                granted.sort_by(|a, b| a.slug.cmp(&b.slug));
                route_record(route, granted)
            })
            .collect();

        Ok(records)
    }

    async fn route_find_key_by_name(&self, name: &str) -> anyhow::Result<Option<String>> {
        Ok(route_permission_map::Entity::find()
            .select_only()
            .column(route_permission_map::Column::RouteKey)
            .filter(route_permission_map::Column::RouteName.eq(name))
            .into_tuple::<String>()
            .one(&self.db)
            .await?)
    }

    async fn route_insert_if_absent(&self, route: NewRoutePolicy) -> anyhow::Result<bool> {
        let tx = self.db.begin().await?;

        let existing = route_permission_map::Entity::find_by_id(route.route_key.as_str())
            .one(&tx)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let now = chrono::Local::now().naive_local();
        route_permission_map::Entity::insert(route_permission_map::ActiveModel {
            route_key: Set(route.route_key),
            method: Set(route.method),
            path: Set(route.path),
            route_name: Set(route.route_name),
            route_description: Set(route.route_description),
            category: Set(route.category),
            requires_auth: Set(route.requires_auth),
            only_primary_role: Set(route.only_primary_role),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .exec_without_returning(&tx)
        .await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn route_grant_create(
        &self,
        route_key: &str,
        permission_id: &str,
    ) -> anyhow::Result<RouteGrantWrite> {
        let tx = self.db.begin().await?;

        let Some(route) = route_permission_map::Entity::find_by_id(route_key)
            .lock_exclusive()
            .one(&tx)
            .await?
        else {
            return Ok(RouteGrantWrite::RouteMissing);
        };
        if route.only_primary_role {
            return Ok(RouteGrantWrite::PrimaryOnly);
        }
        if !permission_locked(&tx, permission_id).await? {
            return Ok(RouteGrantWrite::PermissionMissing);
        }

        let existing = route_permissions::Entity::find_by_id((
            route_key.to_string(),
            permission_id.to_string(),
        ))
        .one(&tx)
        .await?;
        if existing.is_some() {
            return Ok(RouteGrantWrite::AlreadyExists);
        }

        route_permissions::Entity::insert(route_permissions::ActiveModel {
            route_key: Set(route_key.to_string()),
            permission_id: Set(permission_id.to_string()),
            created_at: Set(chrono::Local::now().naive_local()),
        })
        .exec_without_returning(&tx)
        .await?;
        tx.commit().await?;

        Ok(RouteGrantWrite::Created)
    }

    async fn route_grant_delete(
        &self,
        route_key: &str,
        permission_id: &str,
    ) -> anyhow::Result<bool> {
        let result = route_permissions::Entity::delete_by_id((
            route_key.to_string(),
            permission_id.to_string(),
        ))
        .exec(&self.db)
        .await?;

        Ok(result.rows_affected > 0)
    }

    async fn route_update_config(
        &self,
        route_key: &str,
        changes: RouteConfigChanges,
    ) -> anyhow::Result<Option<RouteConfigUpdate>> {
        let tx = self.db.begin().await?;

        let Some(route) = route_permission_map::Entity::find_by_id(route_key)
            .lock_exclusive()
            .one(&tx)
            .await?
        else {
            return Ok(None);
        };

        let before_permissions = route_permissions_of(&tx, route_key).await?;
        let before = route_record(route.clone(), before_permissions.clone());

        let mut active: route_permission_map::ActiveModel = route.into();
        if let Some(name) = changes.route_name {
            active.route_name = Set(Some(name));
        }
        if let Some(description) = changes.route_description {
            active.route_description = Set(Some(description));
        }
        if let Some(only_primary_role) = changes.only_primary_role {
            active.only_primary_role = Set(only_primary_role);
        }
        active.updated_at = Set(chrono::Local::now().naive_local());
        let updated = active.update(&tx).await?;

        let cleared_grants = if updated.only_primary_role {
            route_permissions::Entity::delete_many()
                .filter(route_permissions::Column::RouteKey.eq(route_key))
                .exec(&tx)
                .await?;
            before_permissions
        } else {
            Vec::new()
        };

        let after_permissions = route_permissions_of(&tx, route_key).await?;
        tx.commit().await?;

        tracing::debug!(
            route_key,
            cleared = cleared_grants.len(),
            "route configuration updated"
        );

        Ok(Some(RouteConfigUpdate {
            before,
            after: route_record(updated, after_permissions),
            cleared_grants,
        }))
    }
}

// ============================================================================
// SystemConfigPersistence implementation
// ============================================================================

#[async_trait]
impl SystemConfigPersistence for ExternalDbPersistService {
    async fn config_get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(system_config::Entity::find_by_id(key)
            .one(&self.db)
            .await?
            .map(|m| m.value))
    }

    async fn config_set_if_absent(&self, key: &str, value: &str) -> anyhow::Result<bool> {
        let tx = self.db.begin().await?;

        let existing = system_config::Entity::find_by_id(key)
            .lock_exclusive()
            .one(&tx)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        system_config::Entity::insert(system_config::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(chrono::Local::now().naive_local()),
        })
        .exec_without_returning(&tx)
        .await?;
        tx.commit().await?;

        Ok(true)
    }
}

// ============================================================================
// AuditPersistence implementation
// ============================================================================

#[async_trait]
impl AuditPersistence for ExternalDbPersistService {
    async fn audit_append(&self, entry: AuditEntry) -> anyhow::Result<()> {
        audit_log::Entity::insert(audit_log::ActiveModel {
            id: NotSet,
            user_id: Set(entry.actor_id),
            entity: Set(entry.entity),
            entity_id: Set(entry.entity_id),
            action: Set(entry.action.as_str().to_string()),
            change_details: Set(Some(entry.details.to_string())),
            created_at: Set(entry.created_at),
        })
        .exec(&self.db)
        .await?;

        Ok(())
    }
}
