// Shared fixture for authorization integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use jsonwebtoken::{EncodingKey, Header, encode};

use microfin_auth::{
    DecisionEngine, IdentityResolver, JwtTokenVerifier, PolicyAdministration, PrimaryRoleResolver,
    SYSTEM_ACTOR, Subject, TokenClaims,
};
use microfin_common::RouteKey;
use microfin_persistence::{
    MemoryPersistService, NewPermission, NewRoutePolicy, PermissionInfo, PersistenceService,
    RoutePersistence,
};

pub const ADMIN_ROLE: &str = "role-admin";
pub const OFFICER_ROLE: &str = "role-officer";
pub const CASHIER_ROLE: &str = "role-cashier";

pub const ADMIN: &str = "user-admin";
pub const OFFICER: &str = "user-officer";
pub const CASHIER: &str = "user-cashier";

pub fn test_secret_key() -> String {
    STANDARD.encode("test-secret-key-that-is-long-enough-for-hs256-algorithm")
}

/// Sign a token for `sub` that expires `expire_seconds` from now
pub fn issue_token(sub: &str, expire_seconds: i64) -> String {
    let claims = TokenClaims {
        sub: sub.to_string(),
        exp: chrono::Utc::now().timestamp() + expire_seconds,
    };
    let key = EncodingKey::from_base64_secret(&test_secret_key()).unwrap();

    encode(&Header::default(), &claims, &key).unwrap()
}

pub struct Fixture {
    pub store: Arc<MemoryPersistService>,
    pub persistence: Arc<dyn PersistenceService>,
    pub primary_role: Arc<PrimaryRoleResolver>,
    pub engine: DecisionEngine,
    pub admin: PolicyAdministration,
    pub identity: IdentityResolver,
}

impl Fixture {
    /// Three roles with one active account each; `role-admin` is primary
    pub async fn new() -> Self {
        let store = Arc::new(MemoryPersistService::new());
        store.put_role(ADMIN_ROLE, "Admin");
        store.put_role(OFFICER_ROLE, "Loan Officer");
        store.put_role(CASHIER_ROLE, "Cashier");
        store.put_account(ADMIN, "ACTIVE", Some(ADMIN_ROLE));
        store.put_account(OFFICER, "ACTIVE", Some(OFFICER_ROLE));
        store.put_account(CASHIER, "ACTIVE", Some(CASHIER_ROLE));

        let persistence: Arc<dyn PersistenceService> = store.clone();
        let primary_role = Arc::new(PrimaryRoleResolver::from_store(
            persistence.clone(),
            Duration::from_secs(60),
        ));
        let engine = DecisionEngine::new(persistence.clone(), primary_role.clone());
        let admin = PolicyAdministration::new(persistence.clone(), primary_role.clone());
        let verifier = Arc::new(JwtTokenVerifier::from_base64_secret(&test_secret_key(), 0).unwrap());
        let identity = IdentityResolver::new(verifier, persistence.clone(), primary_role.clone());

        admin
            .initialize_primary_role(SYSTEM_ACTOR, ADMIN_ROLE)
            .await
            .unwrap();

        Self {
            store,
            persistence,
            primary_role,
            engine,
            admin,
            identity,
        }
    }

    pub async fn subject(&self, user_id: &str) -> Subject {
        self.identity.load_subject(user_id).await.unwrap()
    }

    pub async fn permission(&self, slug: &str, category: &str) -> PermissionInfo {
        self.admin
            .create_permission(
                ADMIN,
                NewPermission {
                    slug: slug.to_string(),
                    description: None,
                    category: Some(category.to_string()),
                },
            )
            .await
            .unwrap()
    }

    pub async fn route(&self, method: &str, path: &str, only_primary_role: bool) -> RouteKey {
        self.route_with_auth(method, path, true, only_primary_role).await
    }

    pub async fn route_with_auth(
        &self,
        method: &str,
        path: &str,
        requires_auth: bool,
        only_primary_role: bool,
    ) -> RouteKey {
        let key = RouteKey::new(method, path);
        self.persistence
            .route_insert_if_absent(NewRoutePolicy {
                route_key: key.to_string(),
                method: key.method().to_string(),
                path: key.path().to_string(),
                route_name: Some(key.to_string()),
                route_description: None,
                category: Some("loans".to_string()),
                requires_auth,
                only_primary_role,
            })
            .await
            .unwrap();

        key
    }
}
