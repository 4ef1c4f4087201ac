//! Permission templates
//!
//! Predefined permission sets an operator can apply to a role in one step,
//! typically right after the primary role is initialized.

use crate::BASE_SYSTEM_PERMISSIONS;

/// A named permission set. Entries are (slug, description, category).
#[derive(Debug, Clone, Copy)]
pub struct PermissionTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub recommended: bool,
    pub permissions: &'static [(&'static str, &'static str, &'static str)],
}

pub const PERMISSION_TEMPLATES: &[PermissionTemplate] = &[
    PermissionTemplate {
        id: "base_minimal",
        name: "Minimal base",
        description: "Essential permissions to administer roles, permissions and users",
        recommended: false,
        permissions: BASE_SYSTEM_PERMISSIONS,
    },
    PermissionTemplate {
        id: "full_financial",
        name: "Full financial",
        description: "Loans, collection, field routes, reports and audit for an established lender",
        recommended: true,
        permissions: &[
            ("roles.view", "View roles", "roles"),
            ("roles.create", "Create roles", "roles"),
            ("roles.edit", "Edit roles", "roles"),
            ("roles.delete", "Delete roles", "roles"),
            ("permissions.view", "View permissions", "permissions"),
            ("permissions.create", "Create permissions", "permissions"),
            ("permissions.edit", "Edit permissions", "permissions"),
            ("permissions.delete", "Delete permissions", "permissions"),
            ("permissions.assign", "Assign permissions", "permissions"),
            ("users.view", "View users", "users"),
            ("users.view_details", "View full user details", "users"),
            ("users.create", "Create users", "users"),
            ("users.edit", "Edit users", "users"),
            ("users.delete", "Delete users", "users"),
            ("users.restore", "Restore users", "users"),
            ("users.change_status", "Change user status", "users"),
            ("users.assign_role", "Assign roles to users", "users"),
            ("documents.view", "View documents", "documents"),
            ("documents.review", "Review documents", "documents"),
            ("documents.delete", "Delete documents", "documents"),
            ("loans.view", "View loans", "loans"),
            ("loans.create", "Create loans", "loans"),
            ("loans.edit", "Edit loans", "loans"),
            ("loans.approve", "Approve loans", "loans"),
            ("loans.reject", "Reject loans", "loans"),
            ("loans.disburse", "Disburse loans", "loans"),
            ("collection.view", "View collection", "collection"),
            ("collection.register", "Register payments", "collection"),
            ("collection.manage", "Manage collection", "collection"),
            ("routes.view", "View field routes", "routes"),
            ("routes.create", "Create field routes", "routes"),
            ("routes.edit", "Edit field routes", "routes"),
            ("routes.delete", "Delete field routes", "routes"),
            ("routes.assign", "Assign field routes", "routes"),
            ("reports.view", "View reports", "reports"),
            ("reports.financial", "Financial reports", "reports"),
            ("reports.portfolio", "Portfolio reports", "reports"),
            ("reports.export", "Export reports", "reports"),
            ("audit.view", "View audit log", "audit"),
            ("audit.export", "Export audit log", "audit"),
        ],
    },
    PermissionTemplate {
        id: "micro_credit",
        name: "Micro-credit basic",
        description: "Clients, loans and basic collection for a small micro-credit operation",
        recommended: false,
        permissions: &[
            ("roles.view", "View roles", "roles"),
            ("roles.create", "Create roles", "roles"),
            ("roles.edit", "Edit roles", "roles"),
            ("permissions.view", "View permissions", "permissions"),
            ("permissions.assign", "Assign permissions", "permissions"),
            ("users.view", "View users", "users"),
            ("users.create", "Create users", "users"),
            ("users.edit", "Edit users", "users"),
            ("users.change_status", "Change user status", "users"),
            ("documents.view", "View documents", "documents"),
            ("documents.review", "Review documents", "documents"),
            ("loans.view", "View loans", "loans"),
            ("loans.create", "Create loans", "loans"),
            ("loans.approve", "Approve loans", "loans"),
            ("loans.disburse", "Disburse loans", "loans"),
            ("collection.view", "View collection", "collection"),
            ("collection.register", "Register payments", "collection"),
            ("reports.view", "View reports", "reports"),
        ],
    },
    PermissionTemplate {
        id: "collection_routes",
        name: "Collection and field routes",
        description: "Collection management with field routes for collectors",
        recommended: false,
        permissions: &[
            ("roles.view", "View roles", "roles"),
            ("roles.create", "Create roles", "roles"),
            ("permissions.view", "View permissions", "permissions"),
            ("permissions.assign", "Assign permissions", "permissions"),
            ("users.view", "View users", "users"),
            ("users.create", "Create users", "users"),
            ("users.edit", "Edit users", "users"),
            ("users.change_status", "Change user status", "users"),
            ("users.assign_role", "Assign roles to users", "users"),
            ("loans.view", "View loans", "loans"),
            ("collection.view", "View collection", "collection"),
            ("collection.register", "Register payments", "collection"),
            ("collection.manage", "Manage collection", "collection"),
            ("routes.view", "View field routes", "routes"),
            ("routes.create", "Create field routes", "routes"),
            ("routes.edit", "Edit field routes", "routes"),
            ("routes.assign", "Assign field routes", "routes"),
            ("reports.view", "View reports", "reports"),
            ("reports.export", "Export reports", "reports"),
        ],
    },
];

pub fn find_template(id: &str) -> Option<&'static PermissionTemplate> {
    PERMISSION_TEMPLATES.iter().find(|t| t.id == id)
}
