//! Domain model types for the persistence abstraction layer
//!
//! These types are used as return values from the persistence traits,
//! decoupled from specific storage backends.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Account status as stored on the user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Pending,
    Blocked,
    Deactivated,
    ActionRequired,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Pending => "PENDING",
            AccountStatus::Blocked => "BLOCKED",
            AccountStatus::Deactivated => "DEACTIVATED",
            AccountStatus::ActionRequired => "ACTION_REQUIRED",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AccountStatus::Active),
            "PENDING" => Ok(AccountStatus::Pending),
            "BLOCKED" => Ok(AccountStatus::Blocked),
            "DEACTIVATED" => Ok(AccountStatus::Deactivated),
            "ACTION_REQUIRED" => Ok(AccountStatus::ActionRequired),
            _ => Err(format!("Invalid account status: {}", s)),
        }
    }
}

/// Role information
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Account as seen by the identity layer
///
/// `status` is kept raw so that unknown values can be rejected upstream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: String,
    pub status: String,
    pub deleted: bool,
    pub role: Option<RoleInfo>,
}

/// Permission information
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionInfo {
    pub id: String,
    pub slug: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input for creating a permission
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPermission {
    pub slug: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Partial update of a permission; `None` leaves a field unchanged
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionChanges {
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Outstanding references to a permission
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounts {
    pub roles: u64,
    pub users: u64,
    pub routes: u64,
}

impl UsageCounts {
    pub fn total(&self) -> u64 {
        self.roles + self.users + self.routes
    }

    pub fn is_unused(&self) -> bool {
        self.total() == 0
    }
}

/// Result of an atomic check-then-delete
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PermissionDeletion {
    Deleted(PermissionInfo),
    InUse(UsageCounts),
    NotFound,
}

/// A permission together with everything that references it
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDetail {
    #[serde(flatten)]
    pub permission: PermissionInfo,
    pub roles: Vec<RoleInfo>,
    pub user_ids: Vec<String>,
    pub route_keys: Vec<String>,
}

/// Where a permission grant comes from
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GrantSource {
    Role(String),
    User(String),
}

/// Result of an atomic check-then-insert for role and user grants
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantWrite {
    Created,
    AlreadyExists,
    /// The permission row no longer exists; nothing was written
    PermissionMissing,
}

/// Result of a bulk role grant insert
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrantBatchWrite {
    /// Ids actually inserted, in request order; already granted ids are skipped
    Created(Vec<String>),
    /// This permission does not exist; nothing was written
    PermissionMissing(String),
}

/// Result of an atomic check-then-insert for route grants
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteGrantWrite {
    Created,
    AlreadyExists,
    PrimaryOnly,
    RouteMissing,
    PermissionMissing,
}

/// A stored route policy with its permission requirements
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePolicyRecord {
    pub route_key: String,
    pub method: String,
    pub path: String,
    pub route_name: Option<String>,
    pub route_description: Option<String>,
    pub category: Option<String>,
    pub requires_auth: bool,
    pub only_primary_role: bool,
    pub permissions: Vec<PermissionInfo>,
}

/// Seed row for a route policy
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoutePolicy {
    pub route_key: String,
    pub method: String,
    pub path: String,
    pub route_name: Option<String>,
    pub route_description: Option<String>,
    pub category: Option<String>,
    pub requires_auth: bool,
    pub only_primary_role: bool,
}

/// Partial update of a route policy's configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfigChanges {
    pub route_name: Option<String>,
    pub route_description: Option<String>,
    pub only_primary_role: Option<bool>,
}

/// Outcome of a route configuration update
#[derive(Clone, Debug)]
pub struct RouteConfigUpdate {
    pub before: RoutePolicyRecord,
    pub after: RoutePolicyRecord,
    /// Grants removed because the route became primary-only
    pub cleared_grants: Vec<PermissionInfo>,
}

/// Audit action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only audit record
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub actor_id: String,
    pub entity: String,
    pub entity_id: String,
    pub action: AuditAction,
    pub details: serde_json::Value,
    pub created_at: NaiveDateTime,
}

impl AuditEntry {
    pub fn new(
        actor_id: &str,
        entity: &str,
        entity_id: &str,
        action: AuditAction,
        details: serde_json::Value,
    ) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            entity: entity.to_string(),
            entity_id: entity_id.to_string(),
            action,
            details,
            created_at: chrono::Local::now().naive_local(),
        }
    }
}

/// Storage mode for the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    /// External database (MySQL/PostgreSQL via SeaORM)
    ExternalDb,
    /// In-process storage (single node, no external DB)
    Memory,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::ExternalDb => write!(f, "external_db"),
            StorageMode::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external_db" => Ok(StorageMode::ExternalDb),
            "memory" => Ok(StorageMode::Memory),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_status_round_trip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Pending,
            AccountStatus::Blocked,
            AccountStatus::Deactivated,
            AccountStatus::ActionRequired,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>(), Ok(status));
        }
        assert!("SUSPENDED".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_usage_counts() {
        let counts = UsageCounts {
            roles: 2,
            users: 0,
            routes: 1,
        };
        assert_eq!(counts.total(), 3);
        assert!(!counts.is_unused());
        assert!(UsageCounts::default().is_unused());
    }

    #[test]
    fn test_audit_action_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&AuditAction::Delete).unwrap(),
            "\"DELETE\""
        );
    }
}
