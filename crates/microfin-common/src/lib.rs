//! Microfin Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all Microfin components:
//! - Error types and error codes
//! - Canonical route keys used by the authorization layer
//! - The permission template catalog
//! - Common constants

use std::sync::LazyLock;

pub mod error;
pub mod route;
pub mod template;

// Re-exports for convenience
pub use error::{ErrorCode, MicrofinError};
pub use route::RouteKey;
pub use template::{PERMISSION_TEMPLATES, PermissionTemplate, find_template};

/// System configuration key holding the primary role id
pub const PRIMARY_ROLE_CONFIG_KEY: &str = "system.primary_role_id";

/// Category label used for permissions and routes without one
pub const UNCATEGORIZED: &str = "uncategorized";

/// Base permission catalog: (slug, description, category)
pub const BASE_SYSTEM_PERMISSIONS: &[(&str, &str, &str)] = &[
    ("roles.view", "View roles", "roles"),
    ("roles.manage", "Create, update and delete roles", "roles"),
    ("permissions.view", "View permissions", "permissions"),
    (
        "permissions.manage",
        "Create, update and delete permissions",
        "permissions",
    ),
    (
        "permissions.assign",
        "Assign permissions to roles and routes",
        "permissions",
    ),
    ("users.manage", "Manage user accounts", "users"),
];

static SLUG_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[a-z0-9._-]{3,100}$").expect("Invalid regex pattern"));

/// Permission slugs are lowercase alphanumerics plus `.`, `_` and `-`, 3 to 100 chars.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}
