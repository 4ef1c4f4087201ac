//! Authorization models
//!
//! Subjects, decisions, typed route policies and the read models returned by
//! the administration API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use microfin_common::{PermissionTemplate, RouteKey};
use microfin_persistence::{
    AccountStatus, NewRoutePolicy, PermissionDetail, PermissionInfo, RoleInfo, RoutePolicyRecord,
    UsageCounts,
};

use crate::error::AuthError;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const TOKEN_PREFIX: &str = "Bearer ";

/// Actor id recorded for mutations performed at startup
pub const SYSTEM_ACTOR: &str = "system";

/// Resolved identity of a caller, valid for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub role_id: String,
    pub role_name: String,
    pub status: AccountStatus,
    pub is_primary_role: bool,
}

/// Why a request was allowed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllowReason {
    PublicRoute,
    PrimaryRole,
    PermissionGranted,
    FallbackRole,
}

impl AllowReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllowReason::PublicRoute => "PUBLIC_ROUTE",
            AllowReason::PrimaryRole => "PRIMARY_ROLE",
            AllowReason::PermissionGranted => "PERMISSION_GRANTED",
            AllowReason::FallbackRole => "FALLBACK_ROLE",
        }
    }
}

/// Outcome of one authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    Deny(AuthError),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Decision::Allow(reason) => reason.as_str(),
            Decision::Deny(err) => err.code(),
        }
    }

    pub fn into_result(self) -> Result<AllowReason, AuthError> {
        match self {
            Decision::Allow(reason) => Ok(reason),
            Decision::Deny(err) => Err(err),
        }
    }
}

/// Typed view of a stored route policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePolicy {
    pub route_key: RouteKey,
    pub route_name: Option<String>,
    pub route_description: Option<String>,
    pub category: Option<String>,
    pub requires_auth: bool,
    pub only_primary_role: bool,
    pub permissions: Vec<PermissionInfo>,
}

impl RoutePolicy {
    /// Slugs of which any one satisfies the route
    pub fn required_slugs(&self) -> Vec<String> {
        self.permissions.iter().map(|p| p.slug.clone()).collect()
    }

    pub fn category_or_default(&self) -> &str {
        self.category
            .as_deref()
            .unwrap_or(microfin_common::UNCATEGORIZED)
    }
}

impl TryFrom<RoutePolicyRecord> for RoutePolicy {
    type Error = microfin_common::MicrofinError;

    fn try_from(record: RoutePolicyRecord) -> Result<Self, Self::Error> {
        Ok(RoutePolicy {
            route_key: record.route_key.parse()?,
            route_name: record.route_name,
            route_description: record.route_description,
            category: record.category,
            requires_auth: record.requires_auth,
            only_primary_role: record.only_primary_role,
            permissions: record.permissions,
        })
    }
}

/// Seed description of one exposed route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSeed {
    pub key: RouteKey,
    pub name: &'static str,
    pub category: &'static str,
    pub requires_auth: bool,
    pub only_primary_role: bool,
}

impl From<&RouteSeed> for NewRoutePolicy {
    fn from(seed: &RouteSeed) -> Self {
        NewRoutePolicy {
            route_key: seed.key.to_string(),
            method: seed.key.method().to_string(),
            path: seed.key.path().to_string(),
            route_name: Some(seed.name.to_string()),
            route_description: None,
            category: Some(seed.category.to_string()),
            requires_auth: seed.requires_auth,
            only_primary_role: seed.only_primary_role,
        }
    }
}

/// Aggregate statistics over all route policies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStats {
    pub total: u64,
    pub by_category: BTreeMap<String, u64>,
    pub only_primary_role: u64,
    pub delegable: u64,
    pub with_permissions: u64,
    /// Not primary-only and no grants: locked out for every non-primary subject
    pub without_permissions: u64,
}

/// Route policies grouped by category
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCatalog {
    pub grouped: BTreeMap<String, Vec<RoutePolicy>>,
    pub stats: RouteStats,
}

/// Startup check between exposed routes and stored policies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    /// Exposed routes without a policy row
    pub missing: Vec<RouteKey>,
    /// Policy rows for routes that are not exposed
    pub orphaned: Vec<RouteKey>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.orphaned.is_empty()
    }
}

/// A route with, for each of its permissions, who currently holds it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetail {
    #[serde(flatten)]
    pub policy: RoutePolicy,
    pub holders: Vec<PermissionDetail>,
}

/// Result of a route configuration update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfigOutcome {
    pub route: RoutePolicy,
    pub cleared_permissions: Vec<String>,
}

/// Catalog entry: a permission and its grant usage
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSummary {
    #[serde(flatten)]
    pub permission: PermissionInfo,
    pub usage: UsageCounts,
}

/// Permissions grouped by category
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCatalog {
    pub total: u64,
    pub grouped: BTreeMap<String, Vec<PermissionSummary>>,
}

/// Result of a bulk role grant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkGrantOutcome {
    pub assigned: Vec<String>,
    pub skipped: Vec<String>,
}

/// Catalog entry for a permission template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub recommended: bool,
    pub total_permissions: usize,
}

impl From<&PermissionTemplate> for TemplateSummary {
    fn from(template: &PermissionTemplate) -> Self {
        Self {
            id: template.id.to_string(),
            name: template.name.to_string(),
            description: template.description.to_string(),
            recommended: template.recommended,
            total_permissions: template.permissions.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePermission {
    pub slug: String,
    pub description: String,
    pub category: String,
}

/// A template with its permissions and per-category counts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePreview {
    #[serde(flatten)]
    pub template: TemplateSummary,
    pub category_counts: BTreeMap<String, usize>,
    pub permissions: Vec<TemplatePermission>,
}

impl From<&PermissionTemplate> for TemplatePreview {
    fn from(template: &PermissionTemplate) -> Self {
        let mut category_counts = BTreeMap::new();
        let permissions = template
            .permissions
            .iter()
            .map(|(slug, description, category)| {
                *category_counts.entry(category.to_string()).or_insert(0) += 1;
                TemplatePermission {
                    slug: slug.to_string(),
                    description: description.to_string(),
                    category: category.to_string(),
                }
            })
            .collect();

        Self {
            template: TemplateSummary::from(template),
            category_counts,
            permissions,
        }
    }
}

/// Result of applying a template to a role. Slug lists follow template order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateApplication {
    pub template: TemplateSummary,
    pub role: RoleInfo,
    /// Permissions that did not exist and were created
    pub created: Vec<String>,
    /// Permissions newly granted to the role
    pub assigned: Vec<String>,
    /// Permissions the role already held
    pub skipped: Vec<String>,
}

/// Whether the one-time primary role setup is still pending
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatus {
    pub needs_setup: bool,
    pub primary_role_id: Option<String>,
    /// Pinned by configuration; setup through the API is unavailable
    pub primary_role_pinned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str) -> RoutePolicyRecord {
        RoutePolicyRecord {
            route_key: key.to_string(),
            method: "GET".to_string(),
            path: "/api/roles".to_string(),
            route_name: Some("List roles".to_string()),
            route_description: None,
            category: None,
            requires_auth: true,
            only_primary_role: false,
            permissions: vec![],
        }
    }

    #[test]
    fn test_route_policy_from_record() {
        let policy = RoutePolicy::try_from(record("GET:/api/roles")).unwrap();
        assert_eq!(policy.route_key, RouteKey::new("GET", "/api/roles"));
        assert_eq!(policy.category_or_default(), "uncategorized");
        assert!(policy.required_slugs().is_empty());

        assert!(RoutePolicy::try_from(record("not-a-key")).is_err());
    }

    #[test]
    fn test_decision_helpers() {
        let allow = Decision::Allow(AllowReason::PrimaryRole);
        assert!(allow.is_allowed());
        assert_eq!(allow.reason_code(), "PRIMARY_ROLE");

        let deny = Decision::Deny(AuthError::PrimaryRoleRequired);
        assert!(!deny.is_allowed());
        assert_eq!(
            deny.into_result().unwrap_err(),
            AuthError::PrimaryRoleRequired
        );
    }

    #[test]
    fn test_template_preview_counts_categories() {
        let template = microfin_common::find_template("micro_credit").unwrap();
        let preview = TemplatePreview::from(template);
        assert_eq!(preview.template.total_permissions, 18);
        assert_eq!(preview.category_counts["loans"], 4);
        assert_eq!(preview.category_counts.values().sum::<usize>(), 18);
        assert_eq!(preview.permissions[0].slug, "roles.view");
    }

    #[test]
    fn test_route_seed_into_policy_row() {
        let seed = RouteSeed {
            key: RouteKey::new("delete", "/api/permissions/{id}"),
            name: "Delete permission",
            category: "permissions",
            requires_auth: true,
            only_primary_role: true,
        };
        let row = NewRoutePolicy::from(&seed);
        assert_eq!(row.route_key, "DELETE:/api/permissions/:id");
        assert_eq!(row.method, "DELETE");
        assert_eq!(row.path, "/api/permissions/:id");
        assert!(row.only_primary_role);
    }
}
