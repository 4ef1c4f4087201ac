//! Authorization decision engine
//!
//! Route checks run a fixed decision list, first match wins:
//!
//! 1. no policy for the route key: deny `RouteNotConfigured`
//! 2. policy requires auth and there is no subject: deny `Unauthenticated`
//! 3. policy does not require auth: allow
//! 4. subject holds the primary role: allow
//! 5. route is primary-only: deny `PrimaryRoleRequired`
//! 6. route has no permissions attached: deny `NoPermissionsConfigured`
//! 7. subject holds any attached permission: allow, else deny `MissingPermission`
//!
//! The engine only reads. Store failures surface as `Err`, never as a decision.

use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use microfin_common::RouteKey;
use microfin_persistence::PersistenceService;

use crate::error::AuthError;
use crate::model::{AllowReason, Decision, RoutePolicy, Subject};
use crate::service::permission::PermissionStore;
use crate::service::primary_role::PrimaryRoleResolver;
use crate::service::route::RouteRegistry;

fn login_required() -> Decision {
    Decision::Deny(AuthError::Unauthenticated(
        "Unauthorized. Please login first".to_string(),
    ))
}

fn record_decision(decision: &Decision) {
    let outcome = if decision.is_allowed() { "allow" } else { "deny" };
    counter!("authz_decisions_total", "outcome" => outcome, "reason" => decision.reason_code())
        .increment(1);
}

pub struct DecisionEngine {
    persistence: Arc<dyn PersistenceService>,
    primary_role: Arc<PrimaryRoleResolver>,
    registry: RouteRegistry,
    permissions: PermissionStore,
}

impl DecisionEngine {
    pub fn new(
        persistence: Arc<dyn PersistenceService>,
        primary_role: Arc<PrimaryRoleResolver>,
    ) -> Self {
        Self {
            registry: RouteRegistry::new(persistence.clone()),
            permissions: PermissionStore::new(persistence.clone()),
            persistence,
            primary_role,
        }
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    pub fn permissions(&self) -> &PermissionStore {
        &self.permissions
    }

    /// Decide whether `subject` may call the route identified by `key`
    pub async fn decide(&self, key: &RouteKey, subject: Option<&Subject>) -> anyhow::Result<Decision> {
        let policy = self.registry.resolve(key).await?;
        let decision = self.evaluate(key, policy.as_ref(), subject).await?;

        record_decision(&decision);
        match &decision {
            Decision::Allow(reason) => {
                debug!(route = %key, reason = reason.as_str(), "access allowed");
            }
            Decision::Deny(AuthError::RouteNotConfigured(_)) => {
                warn!(route = %key, "route has no authorization policy");
                counter!("authz_route_not_configured_total").increment(1);
            }
            Decision::Deny(err) => {
                debug!(route = %key, reason = err.code(), "access denied");
            }
        }

        Ok(decision)
    }

    /// Run the decision list against an already resolved policy
    pub async fn evaluate(
        &self,
        key: &RouteKey,
        policy: Option<&RoutePolicy>,
        subject: Option<&Subject>,
    ) -> anyhow::Result<Decision> {
        let Some(policy) = policy else {
            return Ok(Decision::Deny(AuthError::RouteNotConfigured(
                key.to_string(),
            )));
        };

        if policy.requires_auth && subject.is_none() {
            return Ok(login_required());
        }

        if !policy.requires_auth {
            return Ok(Decision::Allow(AllowReason::PublicRoute));
        }

        let Some(subject) = subject else {
            return Ok(login_required());
        };

        if subject.is_primary_role {
            return Ok(Decision::Allow(AllowReason::PrimaryRole));
        }

        if policy.only_primary_role {
            return Ok(Decision::Deny(AuthError::PrimaryRoleRequired));
        }

        let required = policy.required_slugs();
        if required.is_empty() {
            return Ok(Decision::Deny(AuthError::NoPermissionsConfigured));
        }

        if self
            .permissions
            .has_any_permission(&subject.id, &subject.role_id, &required)
            .await?
        {
            Ok(Decision::Allow(AllowReason::PermissionGranted))
        } else {
            Ok(Decision::Deny(AuthError::MissingPermission { required }))
        }
    }

    /// Subject must hold every slug in `required`
    pub async fn require_all(
        &self,
        subject: Option<&Subject>,
        required: &[String],
    ) -> anyhow::Result<Decision> {
        let Some(subject) = subject else {
            return Ok(login_required());
        };
        if subject.is_primary_role {
            return Ok(Decision::Allow(AllowReason::PrimaryRole));
        }

        let missing = self
            .permissions
            .missing_permissions(&subject.id, &subject.role_id, required)
            .await?;

        if missing.is_empty() {
            Ok(Decision::Allow(AllowReason::PermissionGranted))
        } else {
            Ok(Decision::Deny(AuthError::MissingAllPermissions { missing }))
        }
    }

    /// Subject must hold at least one slug in `required`
    pub async fn require_any(
        &self,
        subject: Option<&Subject>,
        required: &[String],
    ) -> anyhow::Result<Decision> {
        let Some(subject) = subject else {
            return Ok(login_required());
        };
        if subject.is_primary_role {
            return Ok(Decision::Allow(AllowReason::PrimaryRole));
        }

        if self
            .permissions
            .has_any_permission(&subject.id, &subject.role_id, required)
            .await?
        {
            Ok(Decision::Allow(AllowReason::PermissionGranted))
        } else {
            Ok(Decision::Deny(AuthError::MissingPermission {
                required: required.to_vec(),
            }))
        }
    }

    /// Require `slug` once it exists in the catalog; until then accept the
    /// fallback role names instead
    pub async fn require_permission_or_role(
        &self,
        subject: Option<&Subject>,
        slug: &str,
        fallback_roles: &[String],
    ) -> anyhow::Result<Decision> {
        self.require_any_permission_or_role(subject, &[slug.to_string()], fallback_roles)
            .await
    }

    /// List form of `require_permission_or_role`: if any slug is registered,
    /// at least one must be held and the fallback roles are ignored
    pub async fn require_any_permission_or_role(
        &self,
        subject: Option<&Subject>,
        slugs: &[String],
        fallback_roles: &[String],
    ) -> anyhow::Result<Decision> {
        let Some(subject) = subject else {
            return Ok(login_required());
        };
        if subject.is_primary_role {
            return Ok(Decision::Allow(AllowReason::PrimaryRole));
        }

        let registered = self.permissions.registered(slugs).await?;
        if !registered.is_empty() {
            return self.require_any(Some(subject), slugs).await;
        }

        if fallback_roles.is_empty() {
            return Ok(Decision::Deny(AuthError::PermissionNotConfigured {
                slugs: slugs.to_vec(),
            }));
        }

        if fallback_roles.contains(&subject.role_name) {
            Ok(Decision::Allow(AllowReason::FallbackRole))
        } else {
            Ok(Decision::Deny(AuthError::RoleNotAllowed {
                allowed: fallback_roles.to_vec(),
            }))
        }
    }

    /// Subject's role must be one of `allowed`; names that match no role are ignored
    pub async fn require_role(
        &self,
        subject: Option<&Subject>,
        allowed: &[String],
    ) -> anyhow::Result<Decision> {
        let Some(subject) = subject else {
            return Ok(login_required());
        };
        if subject.is_primary_role {
            return Ok(Decision::Allow(AllowReason::PrimaryRole));
        }

        let valid = self.persistence.role_find_by_names(allowed).await?;
        if valid.is_empty() {
            return Ok(Decision::Deny(AuthError::InvalidRoleConfiguration));
        }

        if valid.iter().any(|role| role.name == subject.role_name) {
            Ok(Decision::Allow(AllowReason::FallbackRole))
        } else {
            Ok(Decision::Deny(AuthError::RoleNotAllowed {
                allowed: valid.into_iter().map(|role| role.name).collect(),
            }))
        }
    }

    pub fn require_primary_role(&self, subject: Option<&Subject>) -> Decision {
        match subject {
            None => login_required(),
            Some(subject) if subject.is_primary_role => Decision::Allow(AllowReason::PrimaryRole),
            Some(_) => Decision::Deny(AuthError::PrimaryRoleRequired),
        }
    }

    /// Every catalog slug for primary subjects, else the subject's grant union
    pub async fn effective_permissions(&self, subject: &Subject) -> anyhow::Result<BTreeSet<String>> {
        if subject.is_primary_role {
            return self.permissions.all_slugs().await;
        }

        self.permissions
            .list_permissions_for_subject(&subject.id, &subject.role_id)
            .await
    }

    /// Whether a user holds `slug`, looked up fresh from the store
    pub async fn holds_permission(&self, user_id: &str, slug: &str) -> anyhow::Result<bool> {
        let Some(role) = self
            .persistence
            .account_find_by_id(user_id)
            .await?
            .and_then(|account| account.role)
        else {
            return Ok(false);
        };

        if self.primary_role.is_primary(&role.id).await? {
            return Ok(true);
        }

        self.permissions
            .has_any_permission(user_id, &role.id, &[slug.to_string()])
            .await
    }
}
