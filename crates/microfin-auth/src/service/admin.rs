//! Policy administration
//!
//! Every mutation validates its references and invariant, writes, then appends
//! an audit entry. Audit is best-effort: a failed append is logged and counted
//! but the committed mutation stands.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use metrics::counter;
use serde_json::json;
use tracing::{error, info};

use microfin_common::{
    BASE_SYSTEM_PERMISSIONS, PERMISSION_TEMPLATES, PRIMARY_ROLE_CONFIG_KEY, RouteKey,
    UNCATEGORIZED, find_template, is_valid_slug,
};
use microfin_persistence::{
    AuditAction, AuditEntry, GrantBatchWrite, GrantWrite, NewPermission, PermissionChanges,
    PermissionDeletion, PermissionDetail, PermissionInfo, PersistenceService, RoleInfo,
    RouteConfigChanges, RouteGrantWrite,
};

use crate::error::AdminError;
use crate::model::{
    BulkGrantOutcome, PermissionCatalog, PermissionSummary, RouteConfigOutcome, RouteDetail,
    RoutePolicy, SYSTEM_ACTOR, SetupStatus, TemplateApplication, TemplatePreview, TemplateSummary,
};
use crate::service::primary_role::PrimaryRoleResolver;

const PERMISSION: &str = "Permission";
const ROLE_PERMISSION: &str = "RolePermission";
const USER_PERMISSION: &str = "UserPermission";
const ROUTE_PERMISSION: &str = "RoutePermission";
const ROUTE_PERMISSION_MAP: &str = "RoutePermissionMap";
const SYSTEM_CONFIG: &str = "SystemConfig";
const TEMPLATE_ENTITY_ID: &str = "TEMPLATE";

fn grant_outcome(write: GrantWrite, permission_id: &str) -> anyhow::Result<()> {
    match write {
        GrantWrite::Created => Ok(()),
        GrantWrite::AlreadyExists => Err(AdminError::DuplicateGrant.into()),
        GrantWrite::PermissionMissing => {
            Err(AdminError::PermissionNotFound(permission_id.to_string()).into())
        }
    }
}

pub struct PolicyAdministration {
    persistence: Arc<dyn PersistenceService>,
    primary_role: Arc<PrimaryRoleResolver>,
}

impl PolicyAdministration {
    pub fn new(
        persistence: Arc<dyn PersistenceService>,
        primary_role: Arc<PrimaryRoleResolver>,
    ) -> Self {
        Self {
            persistence,
            primary_role,
        }
    }

    async fn audit(
        &self,
        actor_id: &str,
        entity: &str,
        entity_id: &str,
        action: AuditAction,
        details: serde_json::Value,
    ) {
        let entry = AuditEntry::new(actor_id, entity, entity_id, action, details);

        if let Err(e) = self.persistence.audit_append(entry).await {
            error!(
                actor_id,
                entity,
                entity_id,
                action = action.as_str(),
                "audit write failed: {}",
                e
            );
            counter!("audit_write_failures_total", "entity" => entity.to_string()).increment(1);
        }
    }

    async fn permission(&self, id: &str) -> anyhow::Result<PermissionInfo> {
        self.persistence
            .permission_find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::PermissionNotFound(id.to_string()).into())
    }

    async fn role(&self, id: &str) -> anyhow::Result<RoleInfo> {
        self.persistence
            .role_find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::RoleNotFound(id.to_string()).into())
    }

    async fn route(&self, key: &RouteKey) -> anyhow::Result<RoutePolicy> {
        match self.persistence.route_find(&key.to_string()).await? {
            Some(record) => Ok(RoutePolicy::try_from(record)?),
            None => Err(AdminError::RouteNotFound(key.to_string()).into()),
        }
    }

    async fn ensure_slug_available(&self, slug: &str, except_id: Option<&str>) -> anyhow::Result<()> {
        if !is_valid_slug(slug) {
            return Err(AdminError::InvalidSlug(slug.to_string()).into());
        }

        if let Some(existing) = self.persistence.permission_find_by_slug(slug).await?
            && Some(existing.id.as_str()) != except_id
        {
            return Err(AdminError::NameConflict(slug.to_string()).into());
        }

        Ok(())
    }

    // ==================== Permission catalog ====================

    pub async fn create_permission(
        &self,
        actor_id: &str,
        permission: NewPermission,
    ) -> anyhow::Result<PermissionInfo> {
        self.ensure_slug_available(&permission.slug, None).await?;

        let created = self.persistence.permission_create(permission).await?;
        info!(actor_id, slug = %created.slug, "permission created");

        self.audit(
            actor_id,
            PERMISSION,
            &created.id,
            AuditAction::Create,
            json!({ "after": created }),
        )
        .await;

        Ok(created)
    }

    pub async fn update_permission(
        &self,
        actor_id: &str,
        id: &str,
        changes: PermissionChanges,
    ) -> anyhow::Result<PermissionInfo> {
        let before = self.permission(id).await?;

        if let Some(slug) = &changes.slug {
            self.ensure_slug_available(slug, Some(id)).await?;
        }

        let after = self
            .persistence
            .permission_update(id, changes)
            .await?
            .ok_or_else(|| AdminError::PermissionNotFound(id.to_string()))?;
        info!(actor_id, slug = %after.slug, "permission updated");

        self.audit(
            actor_id,
            PERMISSION,
            id,
            AuditAction::Update,
            json!({ "before": before, "after": after }),
        )
        .await;

        Ok(after)
    }

    /// Refused while any role, user or route references the permission
    pub async fn delete_permission(&self, actor_id: &str, id: &str) -> anyhow::Result<PermissionInfo> {
        let deleted = match self.persistence.permission_delete_if_unused(id).await? {
            PermissionDeletion::Deleted(permission) => permission,
            PermissionDeletion::InUse(usage) => return Err(AdminError::PermissionInUse(usage).into()),
            PermissionDeletion::NotFound => {
                return Err(AdminError::PermissionNotFound(id.to_string()).into());
            }
        };
        info!(actor_id, slug = %deleted.slug, "permission deleted");

        self.audit(
            actor_id,
            PERMISSION,
            id,
            AuditAction::Delete,
            json!({ "before": deleted }),
        )
        .await;

        Ok(deleted)
    }

    pub async fn get_permission(&self, id: &str) -> anyhow::Result<PermissionDetail> {
        self.persistence
            .permission_detail(id)
            .await?
            .ok_or_else(|| AdminError::PermissionNotFound(id.to_string()).into())
    }

    /// All permissions with usage counts, grouped by category
    pub async fn list_permissions(&self) -> anyhow::Result<PermissionCatalog> {
        let permissions = self.persistence.permission_find_all().await?;
        let mut usage = self.persistence.permission_usage_counts().await?;

        let mut grouped: BTreeMap<String, Vec<PermissionSummary>> = BTreeMap::new();
        for permission in permissions.iter().cloned() {
            let category = permission
                .category
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED.to_string());
            grouped.entry(category).or_default().push(PermissionSummary {
                usage: usage.remove(&permission.id).unwrap_or_default(),
                permission,
            });
        }

        Ok(PermissionCatalog {
            total: permissions.len() as u64,
            grouped,
        })
    }

    /// Create the base catalog slugs that do not exist yet
    pub async fn seed_base_permissions(&self) -> anyhow::Result<Vec<PermissionInfo>> {
        let mut created = Vec::new();

        for (slug, description, category) in BASE_SYSTEM_PERMISSIONS {
            if self.persistence.permission_find_by_slug(slug).await?.is_some() {
                continue;
            }

            created.push(
                self.create_permission(
                    SYSTEM_ACTOR,
                    NewPermission {
                        slug: slug.to_string(),
                        description: Some(description.to_string()),
                        category: Some(category.to_string()),
                    },
                )
                .await?,
            );
        }

        Ok(created)
    }

    // ==================== Permission templates ====================

    pub fn list_templates(&self) -> Vec<TemplateSummary> {
        PERMISSION_TEMPLATES.iter().map(TemplateSummary::from).collect()
    }

    pub fn preview_template(&self, template_id: &str) -> anyhow::Result<TemplatePreview> {
        find_template(template_id)
            .map(TemplatePreview::from)
            .ok_or_else(|| AdminError::TemplateNotFound(template_id.to_string()).into())
    }

    /// Create the template's missing permissions and grant all of them to
    /// `role_id`, or to the primary role when none is given. Grants the role
    /// already holds are skipped.
    pub async fn apply_template(
        &self,
        actor_id: &str,
        template_id: &str,
        role_id: Option<&str>,
    ) -> anyhow::Result<TemplateApplication> {
        let template = find_template(template_id)
            .ok_or_else(|| AdminError::TemplateNotFound(template_id.to_string()))?;

        let role_id = match role_id {
            Some(role_id) => role_id.to_string(),
            None => self
                .primary_role
                .primary_role_id()
                .await?
                .ok_or(AdminError::PrimaryRoleNotConfigured)?,
        };
        let role = self.role(&role_id).await?;

        let slugs: Vec<String> = template
            .permissions
            .iter()
            .map(|(slug, _, _)| slug.to_string())
            .collect();
        let mut by_slug: HashMap<String, PermissionInfo> = self
            .persistence
            .permission_find_by_slugs(&slugs)
            .await?
            .into_iter()
            .map(|p| (p.slug.clone(), p))
            .collect();

        let mut created = Vec::new();
        for (slug, description, category) in template.permissions {
            if by_slug.contains_key(*slug) {
                continue;
            }

            let permission = self
                .persistence
                .permission_create(NewPermission {
                    slug: slug.to_string(),
                    description: Some(description.to_string()),
                    category: Some(category.to_string()),
                })
                .await?;
            created.push(permission.slug.clone());
            by_slug.insert(permission.slug.clone(), permission);
        }

        let permission_ids: Vec<String> = slugs
            .iter()
            .filter_map(|slug| by_slug.get(slug))
            .map(|p| p.id.clone())
            .collect();
        let assigned_ids: BTreeSet<String> = match self
            .persistence
            .role_grant_create_many(&role_id, &permission_ids)
            .await?
        {
            GrantBatchWrite::Created(ids) => ids.into_iter().collect(),
            GrantBatchWrite::PermissionMissing(id) => {
                return Err(AdminError::PermissionNotFound(id).into());
            }
        };

        let (assigned, skipped): (Vec<String>, Vec<String>) = slugs.into_iter().partition(|slug| {
            by_slug
                .get(slug)
                .is_some_and(|p| assigned_ids.contains(&p.id))
        });
        info!(
            actor_id,
            template = template.id,
            role = %role.name,
            created = created.len(),
            assigned = assigned.len(),
            skipped = skipped.len(),
            "permission template applied"
        );

        self.audit(
            actor_id,
            PERMISSION,
            TEMPLATE_ENTITY_ID,
            AuditAction::Create,
            json!({
                "templateId": template.id,
                "roleId": role.id,
                "roleName": role.name,
                "permissionsCreated": created.len(),
                "permissionsAssigned": assigned.len(),
                "permissionsSkipped": skipped.len(),
            }),
        )
        .await;

        Ok(TemplateApplication {
            template: TemplateSummary::from(template),
            role,
            created,
            assigned,
            skipped,
        })
    }

    // ==================== Role grants ====================

    pub async fn assign_permission_to_role(
        &self,
        actor_id: &str,
        permission_id: &str,
        role_id: &str,
    ) -> anyhow::Result<(RoleInfo, PermissionInfo)> {
        let permission = self.permission(permission_id).await?;
        let role = self.role(role_id).await?;

        grant_outcome(
            self.persistence
                .role_grant_create(role_id, permission_id)
                .await?,
            permission_id,
        )?;
        info!(actor_id, role = %role.name, slug = %permission.slug, "permission assigned to role");

        self.audit(
            actor_id,
            ROLE_PERMISSION,
            &format!("{}:{}", role_id, permission_id),
            AuditAction::Create,
            json!({ "roleId": role_id, "roleName": role.name, "permissionSlug": permission.slug }),
        )
        .await;

        Ok((role, permission))
    }

    pub async fn remove_permission_from_role(
        &self,
        actor_id: &str,
        permission_id: &str,
        role_id: &str,
    ) -> anyhow::Result<(RoleInfo, PermissionInfo)> {
        let permission = self.permission(permission_id).await?;
        let role = self.role(role_id).await?;

        if !self
            .persistence
            .role_grant_delete(role_id, permission_id)
            .await?
        {
            return Err(AdminError::GrantNotFound.into());
        }
        info!(actor_id, role = %role.name, slug = %permission.slug, "permission removed from role");

        self.audit(
            actor_id,
            ROLE_PERMISSION,
            &format!("{}:{}", role_id, permission_id),
            AuditAction::Delete,
            json!({ "roleId": role_id, "roleName": role.name, "permissionSlug": permission.slug }),
        )
        .await;

        Ok((role, permission))
    }

    /// Assign several permissions, skipping those already granted. Fails with
    /// `DuplicateGrant` only when every one was already granted.
    pub async fn assign_permissions_to_role(
        &self,
        actor_id: &str,
        role_id: &str,
        permission_ids: &[String],
    ) -> anyhow::Result<BulkGrantOutcome> {
        let role = self.role(role_id).await?;
        for permission_id in permission_ids {
            self.permission(permission_id).await?;
        }

        let assigned = match self
            .persistence
            .role_grant_create_many(role_id, permission_ids)
            .await?
        {
            GrantBatchWrite::Created(assigned) => assigned,
            GrantBatchWrite::PermissionMissing(id) => {
                return Err(AdminError::PermissionNotFound(id).into());
            }
        };
        if assigned.is_empty() {
            return Err(AdminError::DuplicateGrant.into());
        }

        let mut seen = BTreeSet::new();
        let skipped: Vec<String> = permission_ids
            .iter()
            .filter(|id| !assigned.contains(*id) && seen.insert(id.as_str()))
            .cloned()
            .collect();
        info!(actor_id, role = %role.name, assigned = assigned.len(), "permissions assigned to role");

        self.audit(
            actor_id,
            ROLE_PERMISSION,
            role_id,
            AuditAction::Create,
            json!({ "roleId": role_id, "roleName": role.name, "assigned": assigned, "skipped": skipped }),
        )
        .await;

        Ok(BulkGrantOutcome { assigned, skipped })
    }

    /// Remove several permissions; fails with `GrantNotFound` if none were granted
    pub async fn remove_permissions_from_role(
        &self,
        actor_id: &str,
        role_id: &str,
        permission_ids: &[String],
    ) -> anyhow::Result<Vec<String>> {
        let role = self.role(role_id).await?;

        let removed = self
            .persistence
            .role_grant_delete_many(role_id, permission_ids)
            .await?;
        if removed.is_empty() {
            return Err(AdminError::GrantNotFound.into());
        }
        info!(actor_id, role = %role.name, removed = removed.len(), "permissions removed from role");

        self.audit(
            actor_id,
            ROLE_PERMISSION,
            role_id,
            AuditAction::Delete,
            json!({ "roleId": role_id, "roleName": role.name, "removed": removed }),
        )
        .await;

        Ok(removed)
    }

    // ==================== User grants ====================

    async fn ensure_user(&self, user_id: &str) -> anyhow::Result<()> {
        match self.persistence.account_find_by_id(user_id).await? {
            Some(account) if !account.deleted => Ok(()),
            _ => Err(AdminError::UserNotFound(user_id.to_string()).into()),
        }
    }

    pub async fn assign_permission_to_user(
        &self,
        actor_id: &str,
        permission_id: &str,
        user_id: &str,
    ) -> anyhow::Result<PermissionInfo> {
        let permission = self.permission(permission_id).await?;
        self.ensure_user(user_id).await?;

        grant_outcome(
            self.persistence
                .user_grant_create(user_id, permission_id)
                .await?,
            permission_id,
        )?;
        info!(actor_id, user_id, slug = %permission.slug, "permission assigned to user");

        self.audit(
            actor_id,
            USER_PERMISSION,
            &format!("{}:{}", user_id, permission_id),
            AuditAction::Create,
            json!({ "userId": user_id, "permissionSlug": permission.slug }),
        )
        .await;

        Ok(permission)
    }

    pub async fn remove_permission_from_user(
        &self,
        actor_id: &str,
        permission_id: &str,
        user_id: &str,
    ) -> anyhow::Result<PermissionInfo> {
        let permission = self.permission(permission_id).await?;

        if !self
            .persistence
            .user_grant_delete(user_id, permission_id)
            .await?
        {
            return Err(AdminError::GrantNotFound.into());
        }
        info!(actor_id, user_id, slug = %permission.slug, "permission removed from user");

        self.audit(
            actor_id,
            USER_PERMISSION,
            &format!("{}:{}", user_id, permission_id),
            AuditAction::Delete,
            json!({ "userId": user_id, "permissionSlug": permission.slug }),
        )
        .await;

        Ok(permission)
    }

    // ==================== Route policies ====================

    pub async fn route_detail(&self, key: &RouteKey) -> anyhow::Result<RouteDetail> {
        let policy = self.route(key).await?;

        let mut holders = Vec::with_capacity(policy.permissions.len());
        for permission in &policy.permissions {
            if let Some(detail) = self.persistence.permission_detail(&permission.id).await? {
                holders.push(detail);
            }
        }

        Ok(RouteDetail { policy, holders })
    }

    /// Attach a permission to a route. Primary-only routes take no permissions.
    pub async fn assign_permission_to_route(
        &self,
        actor_id: &str,
        key: &RouteKey,
        permission_id: &str,
    ) -> anyhow::Result<RoutePolicy> {
        let permission = self.permission(permission_id).await?;
        let route_key = key.to_string();

        match self
            .persistence
            .route_grant_create(&route_key, permission_id)
            .await?
        {
            RouteGrantWrite::Created => {}
            RouteGrantWrite::AlreadyExists => return Err(AdminError::DuplicateGrant.into()),
            RouteGrantWrite::PrimaryOnly => {
                return Err(AdminError::PrimaryOnlyRoute(route_key).into());
            }
            RouteGrantWrite::RouteMissing => return Err(AdminError::RouteNotFound(route_key).into()),
            RouteGrantWrite::PermissionMissing => {
                return Err(AdminError::PermissionNotFound(permission_id.to_string()).into());
            }
        }
        info!(actor_id, route = %route_key, slug = %permission.slug, "permission assigned to route");

        self.audit(
            actor_id,
            ROUTE_PERMISSION,
            &route_key,
            AuditAction::Create,
            json!({ "routeKey": route_key, "permissionId": permission_id, "permissionSlug": permission.slug }),
        )
        .await;

        self.route(key).await
    }

    pub async fn remove_permission_from_route(
        &self,
        actor_id: &str,
        key: &RouteKey,
        permission_id: &str,
    ) -> anyhow::Result<RoutePolicy> {
        let route_key = key.to_string();
        self.route(key).await?;

        if !self
            .persistence
            .route_grant_delete(&route_key, permission_id)
            .await?
        {
            return Err(AdminError::GrantNotFound.into());
        }
        info!(actor_id, route = %route_key, permission_id, "permission removed from route");

        self.audit(
            actor_id,
            ROUTE_PERMISSION,
            &route_key,
            AuditAction::Delete,
            json!({ "routeKey": route_key, "permissionId": permission_id }),
        )
        .await;

        self.route(key).await
    }

    /// Update name, description or the primary-only flag. Turning primary-only
    /// on removes every permission attached to the route in the same transaction.
    pub async fn update_route_config(
        &self,
        actor_id: &str,
        key: &RouteKey,
        changes: RouteConfigChanges,
    ) -> anyhow::Result<RouteConfigOutcome> {
        let route_key = key.to_string();

        if let Some(name) = &changes.route_name
            && let Some(owner) = self.persistence.route_find_key_by_name(name).await?
            && owner != route_key
        {
            return Err(AdminError::NameConflict(name.clone()).into());
        }

        let update = self
            .persistence
            .route_update_config(&route_key, changes)
            .await?
            .ok_or_else(|| AdminError::RouteNotFound(route_key.clone()))?;

        let cleared_permissions: Vec<String> =
            update.cleared_grants.iter().map(|p| p.slug.clone()).collect();
        info!(
            actor_id,
            route = %route_key,
            only_primary_role = update.after.only_primary_role,
            cleared = cleared_permissions.len(),
            "route configuration updated"
        );

        self.audit(
            actor_id,
            ROUTE_PERMISSION_MAP,
            &route_key,
            AuditAction::Update,
            json!({
                "before": update.before,
                "after": update.after,
                "clearedPermissions": cleared_permissions,
            }),
        )
        .await;

        Ok(RouteConfigOutcome {
            route: RoutePolicy::try_from(update.after)?,
            cleared_permissions,
        })
    }

    // ==================== System setup ====================

    pub async fn setup_status(&self) -> anyhow::Result<SetupStatus> {
        let primary_role_id = self.primary_role.primary_role_id().await?;
        let primary_role_pinned = self.primary_role.is_fixed();

        Ok(SetupStatus {
            needs_setup: primary_role_id.is_none() && !primary_role_pinned,
            primary_role_id,
            primary_role_pinned,
        })
    }

    /// Designate the primary role. Only possible once.
    pub async fn initialize_primary_role(&self, actor_id: &str, role_id: &str) -> anyhow::Result<RoleInfo> {
        if self.primary_role.is_fixed() {
            return Err(AdminError::PrimaryRoleAlreadyConfigured.into());
        }

        let role = self.role(role_id).await?;

        if !self
            .persistence
            .config_set_if_absent(PRIMARY_ROLE_CONFIG_KEY, role_id)
            .await?
        {
            return Err(AdminError::PrimaryRoleAlreadyConfigured.into());
        }
        self.primary_role.invalidate();
        info!(actor_id, role = %role.name, "primary role initialized");

        self.audit(
            actor_id,
            SYSTEM_CONFIG,
            PRIMARY_ROLE_CONFIG_KEY,
            AuditAction::Create,
            json!({ "roleId": role_id, "roleName": role.name }),
        )
        .await;

        Ok(role)
    }
}
