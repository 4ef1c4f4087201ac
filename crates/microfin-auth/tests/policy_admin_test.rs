// Integration tests for policy administration
// Tests invariant checks, grant management and audit recording

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ADMIN, ADMIN_ROLE, CASHIER, CASHIER_ROLE, Fixture, OFFICER, OFFICER_ROLE};
use microfin_auth::{AdminError, PolicyAdministration, PrimaryRoleResolver, SYSTEM_ACTOR};
use microfin_common::{BASE_SYSTEM_PERMISSIONS, RouteKey};
use microfin_persistence::{
    AuditAction, MemoryPersistService, NewPermission, PermissionChanges, PersistenceService,
    RouteConfigChanges, UsageCounts,
};

fn admin_error(err: anyhow::Error) -> AdminError {
    err.downcast_ref::<AdminError>()
        .cloned()
        .unwrap_or_else(|| panic!("expected AdminError, got {err}"))
}

#[tokio::test]
async fn test_create_permission_validates_slug() {
    let fixture = Fixture::new().await;

    for slug in ["ab", "Loans.View", "loans view"] {
        let err = fixture
            .admin
            .create_permission(
                ADMIN,
                NewPermission {
                    slug: slug.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(admin_error(err), AdminError::InvalidSlug(slug.to_string()));
    }
}

#[tokio::test]
async fn test_create_permission_rejects_existing_slug() {
    let fixture = Fixture::new().await;
    fixture.permission("loans.view", "loans").await;

    let err = fixture
        .admin
        .create_permission(
            ADMIN,
            NewPermission {
                slug: "loans.view".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    let err = admin_error(err);
    assert_eq!(err, AdminError::NameConflict("loans.view".to_string()));
    assert_eq!(err.status(), 409);
}

#[tokio::test]
async fn test_update_permission() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;
    let approve = fixture.permission("loans.approve", "loans").await;

    let updated = fixture
        .admin
        .update_permission(
            ADMIN,
            &view.id,
            PermissionChanges {
                slug: Some("loans.read".to_string()),
                description: Some("Read loans".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.slug, "loans.read");
    assert_eq!(updated.description.as_deref(), Some("Read loans"));
    assert_eq!(updated.category.as_deref(), Some("loans"));

    // keeping its own slug is not a conflict
    fixture
        .admin
        .update_permission(
            ADMIN,
            &view.id,
            PermissionChanges {
                slug: Some("loans.read".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = fixture
        .admin
        .update_permission(
            ADMIN,
            &approve.id,
            PermissionChanges {
                slug: Some("loans.read".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::NameConflict("loans.read".to_string()));

    let err = fixture
        .admin
        .update_permission(ADMIN, "missing", PermissionChanges::default())
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::PermissionNotFound("missing".to_string()));
}

#[tokio::test]
async fn test_delete_permission_in_use_reports_counts() {
    let fixture = Fixture::new().await;
    let key = fixture.route("GET", "/api/loans", false).await;
    let view = fixture.permission("loans.view", "loans").await;

    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();
    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, CASHIER_ROLE)
        .await
        .unwrap();
    fixture
        .admin
        .assign_permission_to_user(ADMIN, &view.id, OFFICER)
        .await
        .unwrap();
    fixture
        .admin
        .assign_permission_to_route(ADMIN, &key, &view.id)
        .await
        .unwrap();

    let err = fixture.admin.delete_permission(ADMIN, &view.id).await.unwrap_err();
    assert_eq!(
        admin_error(err),
        AdminError::PermissionInUse(UsageCounts {
            roles: 2,
            users: 1,
            routes: 1,
        })
    );
    assert!(fixture.admin.get_permission(&view.id).await.is_ok());
}

#[tokio::test]
async fn test_delete_unused_permission() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;

    let deleted = fixture.admin.delete_permission(ADMIN, &view.id).await.unwrap();
    assert_eq!(deleted.slug, "loans.view");

    let err = fixture.admin.get_permission(&view.id).await.unwrap_err();
    assert_eq!(admin_error(err), AdminError::PermissionNotFound(view.id.clone()));

    let err = fixture.admin.delete_permission(ADMIN, &view.id).await.unwrap_err();
    assert_eq!(admin_error(err), AdminError::PermissionNotFound(view.id));
}

#[tokio::test]
async fn test_duplicate_role_grant_is_rejected() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;

    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();
    let err = fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::DuplicateGrant);

    let detail = fixture.admin.get_permission(&view.id).await.unwrap();
    assert_eq!(detail.roles.len(), 1);
    assert_eq!(detail.roles[0].id, OFFICER_ROLE);
}

#[tokio::test]
async fn test_duplicate_user_grant_is_rejected() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;

    fixture
        .admin
        .assign_permission_to_user(ADMIN, &view.id, CASHIER)
        .await
        .unwrap();
    let err = fixture
        .admin
        .assign_permission_to_user(ADMIN, &view.id, CASHIER)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::DuplicateGrant);

    let detail = fixture.admin.get_permission(&view.id).await.unwrap();
    assert_eq!(detail.user_ids, vec![CASHIER.to_string()]);
}

#[tokio::test]
async fn test_remove_permission_from_user() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;

    fixture
        .admin
        .assign_permission_to_user(ADMIN, &view.id, CASHIER)
        .await
        .unwrap();
    let removed = fixture
        .admin
        .remove_permission_from_user(ADMIN, &view.id, CASHIER)
        .await
        .unwrap();
    assert_eq!(removed.id, view.id);

    let detail = fixture.admin.get_permission(&view.id).await.unwrap();
    assert!(detail.user_ids.is_empty());

    let err = fixture
        .admin
        .remove_permission_from_user(ADMIN, &view.id, CASHIER)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::GrantNotFound);

    let entries = fixture.store.audit_entries();
    let last = entries.last().unwrap();
    assert_eq!(last.entity, "UserPermission");
    assert_eq!(last.action, AuditAction::Delete);
    assert_eq!(last.entity_id, format!("{}:{}", CASHIER, view.id));
    assert_eq!(last.details["permissionSlug"], "loans.view");
}

#[tokio::test]
async fn test_remove_permission_from_role_returns_both_sides() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;

    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();
    let (role, permission) = fixture
        .admin
        .remove_permission_from_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();
    assert_eq!(role.id, OFFICER_ROLE);
    assert_eq!(permission.slug, "loans.view");
}

#[tokio::test]
async fn test_grant_references_are_validated() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;

    let err = fixture
        .admin
        .assign_permission_to_role(ADMIN, "missing", OFFICER_ROLE)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::PermissionNotFound("missing".to_string()));

    let err = fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, "role-missing")
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::RoleNotFound("role-missing".to_string()));

    fixture.store.soft_delete_account(CASHIER);
    let err = fixture
        .admin
        .assign_permission_to_user(ADMIN, &view.id, CASHIER)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::UserNotFound(CASHIER.to_string()));

    let err = fixture
        .admin
        .remove_permission_from_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::GrantNotFound);
}

#[tokio::test]
async fn test_bulk_role_assignment_skips_existing() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;
    let approve = fixture.permission("loans.approve", "loans").await;

    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();

    let ids = vec![view.id.clone(), approve.id.clone()];
    let outcome = fixture
        .admin
        .assign_permissions_to_role(ADMIN, OFFICER_ROLE, &ids)
        .await
        .unwrap();
    assert_eq!(outcome.assigned, vec![approve.id.clone()]);
    assert_eq!(outcome.skipped, vec![view.id.clone()]);

    let err = fixture
        .admin
        .assign_permissions_to_role(ADMIN, OFFICER_ROLE, &ids)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::DuplicateGrant);

    let err = fixture
        .admin
        .assign_permissions_to_role(ADMIN, CASHIER_ROLE, &[view.id.clone(), "missing".to_string()])
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::PermissionNotFound("missing".to_string()));

    let removed = fixture
        .admin
        .remove_permissions_from_role(ADMIN, OFFICER_ROLE, &ids)
        .await
        .unwrap();
    assert_eq!(removed.len(), 2);

    let err = fixture
        .admin
        .remove_permissions_from_role(ADMIN, OFFICER_ROLE, &ids)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::GrantNotFound);
}

#[tokio::test]
async fn test_bulk_skipped_lists_each_permission_once() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;
    let approve = fixture.permission("loans.approve", "loans").await;

    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();

    let ids = vec![view.id.clone(), approve.id.clone(), view.id.clone()];
    let outcome = fixture
        .admin
        .assign_permissions_to_role(ADMIN, OFFICER_ROLE, &ids)
        .await
        .unwrap();
    assert_eq!(outcome.assigned, vec![approve.id.clone()]);
    assert_eq!(outcome.skipped, vec![view.id.clone()]);
}

#[tokio::test]
async fn test_primary_only_route_takes_no_permissions() {
    let fixture = Fixture::new().await;
    let key = fixture.route("DELETE", "/api/roles/:id", true).await;
    let manage = fixture.permission("roles.manage", "roles").await;

    let err = fixture
        .admin
        .assign_permission_to_route(ADMIN, &key, &manage.id)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::PrimaryOnlyRoute(key.to_string()));

    let missing = RouteKey::new("GET", "/api/nowhere");
    let err = fixture
        .admin
        .assign_permission_to_route(ADMIN, &missing, &manage.id)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::RouteNotFound(missing.to_string()));
}

#[tokio::test]
async fn test_route_grant_round_trip() {
    let fixture = Fixture::new().await;
    let key = fixture.route("GET", "/api/loans", false).await;
    let view = fixture.permission("loans.view", "loans").await;

    let policy = fixture
        .admin
        .assign_permission_to_route(ADMIN, &key, &view.id)
        .await
        .unwrap();
    assert_eq!(policy.required_slugs(), vec!["loans.view".to_string()]);

    let err = fixture
        .admin
        .assign_permission_to_route(ADMIN, &key, &view.id)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::DuplicateGrant);

    let policy = fixture
        .admin
        .remove_permission_from_route(ADMIN, &key, &view.id)
        .await
        .unwrap();
    assert!(policy.permissions.is_empty());
}

#[tokio::test]
async fn test_route_name_must_be_unique() {
    let fixture = Fixture::new().await;
    let loans = fixture.route("GET", "/api/loans", false).await;
    let wallets = fixture.route("GET", "/api/wallets", false).await;

    let outcome = fixture
        .admin
        .update_route_config(
            ADMIN,
            &loans,
            RouteConfigChanges {
                route_name: Some("List loans".to_string()),
                route_description: Some("All loans of the branch".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.route.route_name.as_deref(), Some("List loans"));
    assert!(outcome.cleared_permissions.is_empty());

    // renaming to its own name is allowed
    fixture
        .admin
        .update_route_config(
            ADMIN,
            &loans,
            RouteConfigChanges {
                route_name: Some("List loans".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = fixture
        .admin
        .update_route_config(
            ADMIN,
            &wallets,
            RouteConfigChanges {
                route_name: Some("List loans".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::NameConflict("List loans".to_string()));
}

#[tokio::test]
async fn test_route_detail_lists_holders() {
    let fixture = Fixture::new().await;
    let key = fixture.route("GET", "/api/loans", false).await;
    let view = fixture.permission("loans.view", "loans").await;

    fixture
        .admin
        .assign_permission_to_route(ADMIN, &key, &view.id)
        .await
        .unwrap();
    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, CASHIER_ROLE)
        .await
        .unwrap();
    fixture
        .admin
        .assign_permission_to_user(ADMIN, &view.id, OFFICER)
        .await
        .unwrap();

    let detail = fixture.admin.route_detail(&key).await.unwrap();
    assert_eq!(detail.holders.len(), 1);
    assert_eq!(detail.holders[0].roles[0].name, "Cashier");
    assert_eq!(detail.holders[0].user_ids, vec![OFFICER.to_string()]);
    assert_eq!(detail.holders[0].route_keys, vec![key.to_string()]);
}

#[tokio::test]
async fn test_list_permissions_groups_by_category() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;
    fixture.permission("loans.approve", "loans").await;
    fixture
        .admin
        .create_permission(
            ADMIN,
            NewPermission {
                slug: "reports.export".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();

    let catalog = fixture.admin.list_permissions().await.unwrap();
    assert_eq!(catalog.total, 3);
    assert_eq!(catalog.grouped["loans"].len(), 2);
    assert_eq!(catalog.grouped["uncategorized"].len(), 1);

    let view_summary = catalog.grouped["loans"]
        .iter()
        .find(|summary| summary.permission.slug == "loans.view")
        .unwrap();
    assert_eq!(view_summary.usage.roles, 1);
}

#[tokio::test]
async fn test_seed_base_permissions_is_idempotent() {
    let fixture = Fixture::new().await;

    let created = fixture.admin.seed_base_permissions().await.unwrap();
    assert_eq!(created.len(), BASE_SYSTEM_PERMISSIONS.len());

    let created = fixture.admin.seed_base_permissions().await.unwrap();
    assert!(created.is_empty());

    let entries = fixture.store.audit_entries();
    assert!(
        entries
            .iter()
            .filter(|entry| entry.entity == "Permission")
            .all(|entry| entry.actor_id == SYSTEM_ACTOR)
    );
}

#[tokio::test]
async fn test_templates_are_listed_and_previewed() {
    let fixture = Fixture::new().await;

    let templates = fixture.admin.list_templates();
    let ids: Vec<&str> = templates.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["base_minimal", "full_financial", "micro_credit", "collection_routes"]
    );
    assert!(templates.iter().filter(|t| t.recommended).count() == 1);

    let preview = fixture.admin.preview_template("full_financial").unwrap();
    assert_eq!(preview.template.total_permissions, 40);
    assert_eq!(preview.category_counts["loans"], 6);

    let err = fixture.admin.preview_template("unknown").unwrap_err();
    assert_eq!(admin_error(err), AdminError::TemplateNotFound("unknown".to_string()));
}

#[tokio::test]
async fn test_apply_template_defaults_to_primary_role() {
    let fixture = Fixture::new().await;

    let applied = fixture
        .admin
        .apply_template(ADMIN, "base_minimal", None)
        .await
        .unwrap();
    assert_eq!(applied.role.id, ADMIN_ROLE);
    assert_eq!(applied.created.len(), 6);
    assert_eq!(applied.assigned.len(), 6);
    assert!(applied.skipped.is_empty());

    let catalog = fixture.admin.list_permissions().await.unwrap();
    assert_eq!(catalog.total, 6);

    let entry = fixture.store.audit_entries().pop().unwrap();
    assert_eq!(entry.entity, "Permission");
    assert_eq!(entry.entity_id, "TEMPLATE");
    assert_eq!(entry.details["templateId"], "base_minimal");
    assert_eq!(entry.details["permissionsAssigned"], 6);
}

#[tokio::test]
async fn test_apply_template_reuses_existing_permissions() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;
    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();

    let applied = fixture
        .admin
        .apply_template(ADMIN, "micro_credit", Some(OFFICER_ROLE))
        .await
        .unwrap();
    assert_eq!(applied.created.len(), 17);
    assert!(!applied.created.contains(&"loans.view".to_string()));
    assert_eq!(applied.assigned.len(), 17);
    assert_eq!(applied.skipped, vec!["loans.view".to_string()]);

    let again = fixture
        .admin
        .apply_template(ADMIN, "micro_credit", Some(OFFICER_ROLE))
        .await
        .unwrap();
    assert!(again.created.is_empty());
    assert!(again.assigned.is_empty());
    assert_eq!(again.skipped.len(), 18);

    let officer = fixture.subject(OFFICER).await;
    let held = fixture.engine.effective_permissions(&officer).await.unwrap();
    assert_eq!(held.len(), 18);
}

#[tokio::test]
async fn test_apply_template_validates_target() {
    let fixture = Fixture::new().await;

    let err = fixture
        .admin
        .apply_template(ADMIN, "unknown", None)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::TemplateNotFound("unknown".to_string()));

    let err = fixture
        .admin
        .apply_template(ADMIN, "base_minimal", Some("role-missing"))
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::RoleNotFound("role-missing".to_string()));
    assert_eq!(fixture.admin.list_permissions().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_setup_is_pending_until_primary_role_initialized() {
    let store = Arc::new(MemoryPersistService::new());
    store.put_role(ADMIN_ROLE, "Admin");
    let persistence: Arc<dyn PersistenceService> = store.clone();
    let primary_role = Arc::new(PrimaryRoleResolver::from_store(
        persistence.clone(),
        Duration::from_secs(60),
    ));
    let admin = PolicyAdministration::new(persistence, primary_role);

    let status = admin.setup_status().await.unwrap();
    assert!(status.needs_setup);
    assert!(status.primary_role_id.is_none());

    let err = admin.apply_template(ADMIN, "base_minimal", None).await.unwrap_err();
    assert_eq!(admin_error(err), AdminError::PrimaryRoleNotConfigured);

    admin.initialize_primary_role(ADMIN, ADMIN_ROLE).await.unwrap();

    let status = admin.setup_status().await.unwrap();
    assert!(!status.needs_setup);
    assert_eq!(status.primary_role_id.as_deref(), Some(ADMIN_ROLE));
    assert!(!status.primary_role_pinned);
}

#[tokio::test]
async fn test_pinned_primary_role_needs_no_setup() {
    let persistence: Arc<dyn PersistenceService> = Arc::new(MemoryPersistService::new());
    let admin = PolicyAdministration::new(
        persistence,
        Arc::new(PrimaryRoleResolver::fixed(Some(ADMIN_ROLE.to_string()))),
    );

    let status = admin.setup_status().await.unwrap();
    assert!(!status.needs_setup);
    assert!(status.primary_role_pinned);

    let err = admin
        .initialize_primary_role(ADMIN, ADMIN_ROLE)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::PrimaryRoleAlreadyConfigured);
}

#[tokio::test]
async fn test_primary_role_is_initialized_once() {
    let fixture = Fixture::new().await;

    let err = fixture
        .admin
        .initialize_primary_role(ADMIN, OFFICER_ROLE)
        .await
        .unwrap_err();
    assert_eq!(admin_error(err), AdminError::PrimaryRoleAlreadyConfigured);

    assert_eq!(
        fixture.primary_role.primary_role_id().await.unwrap().as_deref(),
        Some(ADMIN_ROLE)
    );
}

#[tokio::test]
async fn test_mutations_are_audited() {
    let fixture = Fixture::new().await;
    let key = fixture.route("GET", "/api/loans", false).await;
    let view = fixture.permission("loans.view", "loans").await;

    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();
    fixture
        .admin
        .assign_permission_to_route(ADMIN, &key, &view.id)
        .await
        .unwrap();
    fixture
        .admin
        .update_route_config(
            ADMIN,
            &key,
            RouteConfigChanges {
                only_primary_role: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let entries = fixture.store.audit_entries();
    let summary: Vec<(&str, AuditAction)> = entries
        .iter()
        .filter(|entry| entry.actor_id == ADMIN)
        .map(|entry| (entry.entity.as_str(), entry.action))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Permission", AuditAction::Create),
            ("RolePermission", AuditAction::Create),
            ("RoutePermission", AuditAction::Create),
            ("RoutePermissionMap", AuditAction::Update),
        ]
    );

    let toggle = entries.last().unwrap();
    assert_eq!(toggle.entity_id, key.to_string());
    assert_eq!(toggle.details["before"]["onlyPrimaryRole"], false);
    assert_eq!(toggle.details["after"]["onlyPrimaryRole"], true);
    assert_eq!(toggle.details["clearedPermissions"][0], "loans.view");
}

#[tokio::test]
async fn test_audit_failure_keeps_mutation() {
    let fixture = Fixture::new().await;
    let view = fixture.permission("loans.view", "loans").await;
    let before = fixture.store.audit_entries().len();

    fixture.store.set_audit_failure(true);
    fixture
        .admin
        .assign_permission_to_role(ADMIN, &view.id, OFFICER_ROLE)
        .await
        .unwrap();
    fixture.store.set_audit_failure(false);

    let detail = fixture.admin.get_permission(&view.id).await.unwrap();
    assert_eq!(detail.roles.len(), 1);
    assert_eq!(fixture.store.audit_entries().len(), before);
}
