//! Authorization and administration error taxonomies
//!
//! Every denial carries a stable reason code and an HTTP status; the server's
//! error formatter reads both.

use microfin_persistence::{AccountStatus, UsageCounts};

/// Identity and access denials
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("Invalid credentials")]
    AccountInvalid,

    #[error("{}", inactive_message(.0))]
    AccountInactive(AccountStatus),

    #[error("User role not found")]
    RoleMissing,

    #[error("Route not configured: {0}")]
    RouteNotConfigured(String),

    #[error("Access denied. Primary role required")]
    PrimaryRoleRequired,

    #[error("Access denied. No permissions configured for this route")]
    NoPermissionsConfigured,

    #[error("Access denied. Required at least one of: {}", .required.join(", "))]
    MissingPermission { required: Vec<String> },

    #[error("Access denied. Missing permissions: {}", .missing.join(", "))]
    MissingAllPermissions { missing: Vec<String> },

    #[error("Access denied. Required role: {}", .allowed.join(" or "))]
    RoleNotAllowed { allowed: Vec<String> },

    #[error("Access denied. Permissions not configured: {}", .slugs.join(", "))]
    PermissionNotConfigured { slugs: Vec<String> },

    #[error("Invalid role configuration")]
    InvalidRoleConfiguration,
}

fn inactive_message(status: &AccountStatus) -> &'static str {
    match status {
        AccountStatus::Blocked => "Access denied. Account is blocked",
        AccountStatus::Deactivated => "Access denied. Account is deactivated",
        AccountStatus::Pending => "Account verification pending",
        AccountStatus::ActionRequired => "Action required on your account",
        AccountStatus::Active => "Account is active",
    }
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated(_) => "UNAUTHENTICATED",
            AuthError::AccountInvalid => "ACCOUNT_INVALID",
            AuthError::AccountInactive(_) => "ACCOUNT_INACTIVE",
            AuthError::RoleMissing => "ROLE_MISSING",
            AuthError::RouteNotConfigured(_) => "ROUTE_NOT_CONFIGURED",
            AuthError::PrimaryRoleRequired => "PRIMARY_ROLE_REQUIRED",
            AuthError::NoPermissionsConfigured => "NO_PERMISSIONS_CONFIGURED",
            AuthError::MissingPermission { .. } => "MISSING_PERMISSION",
            AuthError::MissingAllPermissions { .. } => "MISSING_PERMISSION",
            AuthError::RoleNotAllowed { .. } => "ROLE_NOT_ALLOWED",
            AuthError::PermissionNotConfigured { .. } => "PERMISSION_NOT_CONFIGURED",
            AuthError::InvalidRoleConfiguration => "INVALID_ROLE_CONFIGURATION",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            AuthError::Unauthenticated(_) | AuthError::AccountInvalid => 401,
            AuthError::InvalidRoleConfiguration => 500,
            _ => 403,
        }
    }

    /// Slugs that would have satisfied the check, for diagnostics
    pub fn satisfying_permissions(&self) -> Option<&[String]> {
        match self {
            AuthError::MissingPermission { required } => Some(required),
            AuthError::MissingAllPermissions { missing } => Some(missing),
            _ => None,
        }
    }
}

/// Administration-time validation errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("Permission not found: {0}")]
    PermissionNotFound(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Invalid route key: {0}")]
    InvalidRouteKey(String),

    #[error("Permission is already assigned")]
    DuplicateGrant,

    #[error("Permission is not assigned")]
    GrantNotFound,

    #[error(
        "Permission is in use by {} role(s), {} user(s) and {} route(s)",
        .0.roles, .0.users, .0.routes
    )]
    PermissionInUse(UsageCounts),

    #[error("Name already in use: {0}")]
    NameConflict(String),

    #[error("Route {0} is restricted to the primary role and cannot take permissions")]
    PrimaryOnlyRoute(String),

    #[error("Invalid slug '{0}': use 3-100 characters of a-z, 0-9, '.', '_' or '-'")]
    InvalidSlug(String),

    #[error("Primary role is already configured")]
    PrimaryRoleAlreadyConfigured,

    #[error("Primary role is not configured")]
    PrimaryRoleNotConfigured,

    #[error("Permission template not found: {0}")]
    TemplateNotFound(String),
}

impl AdminError {
    pub fn code(&self) -> &'static str {
        match self {
            AdminError::PermissionNotFound(_) => "PERMISSION_NOT_FOUND",
            AdminError::RoleNotFound(_) => "ROLE_NOT_FOUND",
            AdminError::UserNotFound(_) => "USER_NOT_FOUND",
            AdminError::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            AdminError::InvalidRouteKey(_) => "INVALID_ROUTE_KEY",
            AdminError::DuplicateGrant => "DUPLICATE_GRANT",
            AdminError::GrantNotFound => "GRANT_NOT_FOUND",
            AdminError::PermissionInUse(_) => "PERMISSION_IN_USE",
            AdminError::NameConflict(_) => "NAME_CONFLICT",
            AdminError::PrimaryOnlyRoute(_) => "PRIMARY_ONLY_ROUTE",
            AdminError::InvalidSlug(_) => "INVALID_SLUG",
            AdminError::PrimaryRoleAlreadyConfigured => "PRIMARY_ROLE_ALREADY_CONFIGURED",
            AdminError::PrimaryRoleNotConfigured => "PRIMARY_ROLE_NOT_CONFIGURED",
            AdminError::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            AdminError::PermissionNotFound(_)
            | AdminError::RoleNotFound(_)
            | AdminError::UserNotFound(_)
            | AdminError::RouteNotFound(_)
            | AdminError::TemplateNotFound(_)
            | AdminError::GrantNotFound => 404,
            AdminError::NameConflict(_)
            | AdminError::PrimaryRoleAlreadyConfigured
            | AdminError::PrimaryRoleNotConfigured => 409,
            _ => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_status_mapping() {
        assert_eq!(AuthError::Unauthenticated("x".into()).status(), 401);
        assert_eq!(AuthError::AccountInvalid.status(), 401);
        assert_eq!(AuthError::AccountInactive(AccountStatus::Blocked).status(), 403);
        assert_eq!(AuthError::RoleMissing.status(), 403);
        assert_eq!(AuthError::RouteNotConfigured("GET:/x".into()).status(), 403);
        assert_eq!(AuthError::PrimaryRoleRequired.status(), 403);
        assert_eq!(AuthError::NoPermissionsConfigured.status(), 403);
        assert_eq!(
            AuthError::MissingPermission { required: vec![] }.status(),
            403
        );
        assert_eq!(AuthError::InvalidRoleConfiguration.status(), 500);
    }

    #[test]
    fn test_inactive_messages_are_status_specific() {
        assert_eq!(
            AuthError::AccountInactive(AccountStatus::Blocked).to_string(),
            "Access denied. Account is blocked"
        );
        assert_eq!(
            AuthError::AccountInactive(AccountStatus::Pending).to_string(),
            "Account verification pending"
        );
    }

    #[test]
    fn test_missing_permission_lists_slugs() {
        let err = AuthError::MissingPermission {
            required: vec!["roles.view".into(), "roles.manage".into()],
        };
        assert_eq!(err.code(), "MISSING_PERMISSION");
        assert_eq!(
            err.to_string(),
            "Access denied. Required at least one of: roles.view, roles.manage"
        );
        assert_eq!(err.satisfying_permissions().map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_permission_in_use_message() {
        let err = AdminError::PermissionInUse(UsageCounts {
            roles: 2,
            users: 1,
            routes: 0,
        });
        assert_eq!(
            err.to_string(),
            "Permission is in use by 2 role(s), 1 user(s) and 0 route(s)"
        );
        assert_eq!(err.status(), 400);
        assert_eq!(AdminError::NameConflict("x".into()).status(), 409);
        assert_eq!(AdminError::GrantNotFound.status(), 404);
    }
}
