//! External database backend tests
//!
//! Run with `TEST_DATABASE_URL=mysql://... cargo test -- --ignored`.

use microfin_persistence::entity::{
    audit_log, permissions, role_permissions, roles, route_permission_map, route_permissions,
    system_config, user_permissions, users,
};
use microfin_persistence::sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use microfin_persistence::*;

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt))
        .await
        .expect("create table failed");
}

async fn connect() -> ExternalDbPersistService {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL not set");
    let db = Database::connect(&url)
        .await
        .expect("Database connection failed");

    create_table(&db, users::Entity).await;
    create_table(&db, roles::Entity).await;
    create_table(&db, permissions::Entity).await;
    create_table(&db, role_permissions::Entity).await;
    create_table(&db, user_permissions::Entity).await;
    create_table(&db, route_permission_map::Entity).await;
    create_table(&db, route_permissions::Entity).await;
    create_table(&db, system_config::Entity).await;
    create_table(&db, audit_log::Entity).await;

    ExternalDbPersistService::new(db)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires test database"]
async fn test_grant_union_and_delete_guard() {
    let store = connect().await;
    let role_id = unique("role");
    let user_id = unique("user");

    let view = store
        .permission_create(NewPermission {
            slug: unique("roles.view"),
            ..Default::default()
        })
        .await
        .unwrap();
    let manage = store
        .permission_create(NewPermission {
            slug: unique("roles.manage"),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(
        store.role_grant_create(&role_id, &view.id).await.unwrap(),
        GrantWrite::Created
    );
    assert_eq!(
        store.role_grant_create(&role_id, &view.id).await.unwrap(),
        GrantWrite::AlreadyExists
    );
    store.user_grant_create(&user_id, &manage.id).await.unwrap();

    let slugs = store
        .grant_find_slugs(
            &[GrantSource::Role(role_id.clone()), GrantSource::User(user_id.clone())],
            None,
        )
        .await
        .unwrap();
    assert!(slugs.contains(&view.slug));
    assert!(slugs.contains(&manage.slug));

    match store.permission_delete_if_unused(&view.id).await.unwrap() {
        PermissionDeletion::InUse(counts) => assert_eq!(counts.roles, 1),
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert!(store.role_grant_delete(&role_id, &view.id).await.unwrap());
    assert!(matches!(
        store.permission_delete_if_unused(&view.id).await.unwrap(),
        PermissionDeletion::Deleted(_)
    ));

    assert_eq!(
        store.role_grant_create(&role_id, &view.id).await.unwrap(),
        GrantWrite::PermissionMissing
    );
    assert_eq!(
        store.user_grant_create(&user_id, &view.id).await.unwrap(),
        GrantWrite::PermissionMissing
    );
    assert_eq!(
        store
            .role_grant_create_many(&role_id, &[manage.id.clone(), view.id.clone()])
            .await
            .unwrap(),
        GrantBatchWrite::PermissionMissing(view.id.clone())
    );
    assert!(
        store
            .role_grant_find_by_role(&role_id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[ignore = "requires test database"]
async fn test_primary_only_toggle_clears_route_grants() {
    let store = connect().await;
    let route_key = format!("GET:/api/{}", unique("reports"));

    store
        .route_insert_if_absent(NewRoutePolicy {
            route_key: route_key.clone(),
            method: "GET".to_string(),
            path: route_key.trim_start_matches("GET:").to_string(),
            route_name: None,
            route_description: None,
            category: Some("reports".to_string()),
            requires_auth: true,
            only_primary_role: false,
        })
        .await
        .unwrap();

    for prefix in ["reports.view", "reports.export"] {
        let permission = store
            .permission_create(NewPermission {
                slug: unique(prefix),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            store
                .route_grant_create(&route_key, &permission.id)
                .await
                .unwrap(),
            RouteGrantWrite::Created
        );
    }

    let update = store
        .route_update_config(
            &route_key,
            RouteConfigChanges {
                only_primary_role: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(update.cleared_grants.len(), 2);
    assert!(update.after.only_primary_role);
    assert!(update.after.permissions.is_empty());

    let stored = store.route_find(&route_key).await.unwrap().unwrap();
    assert!(stored.permissions.is_empty());
}
