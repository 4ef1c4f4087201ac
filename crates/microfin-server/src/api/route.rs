//! Route inventory and registration
//!
//! `EXPOSED_ROUTES` lists every route the server registers. The same table
//! seeds route policies at startup, feeds the consistency check and lets the
//! access middleware map a concrete request path back to its route key.

use actix_web::dev::ResourceDef;
use actix_web::{Scope, web};

use microfin_auth::RouteSeed;
use microfin_common::RouteKey;

/// Static description of one exposed route
#[derive(Debug, Clone, Copy)]
pub struct ExposedRoute {
    pub method: &'static str,
    /// actix pattern relative to the context path
    pub pattern: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub requires_auth: bool,
    pub only_primary_role: bool,
}

const fn admin(
    method: &'static str,
    pattern: &'static str,
    name: &'static str,
    category: &'static str,
) -> ExposedRoute {
    ExposedRoute {
        method,
        pattern,
        name,
        category,
        requires_auth: true,
        only_primary_role: true,
    }
}

const fn open(
    method: &'static str,
    pattern: &'static str,
    name: &'static str,
    category: &'static str,
) -> ExposedRoute {
    ExposedRoute {
        method,
        pattern,
        name,
        category,
        requires_auth: false,
        only_primary_role: false,
    }
}

pub const EXPOSED_ROUTES: &[ExposedRoute] = &[
    // Self-service: the handler requires an authenticated subject itself
    open("GET", "/auth/permissions", "My permissions", "auth"),
    open("GET", "/system/health", "Health check", "system"),
    open("GET", "/setup/status", "Setup status", "setup"),
    // Refused by the handler once a primary role exists
    open("POST", "/setup/initialize", "Initialize primary role", "setup"),
    admin("GET", "/system/metrics", "Prometheus metrics", "system"),
    admin("POST", "/permissions", "Create permission", "permissions"),
    admin("GET", "/permissions", "List permissions", "permissions"),
    admin("GET", "/permissions/{id}", "Permission detail", "permissions"),
    admin("PUT", "/permissions/{id}", "Update permission", "permissions"),
    admin("DELETE", "/permissions/{id}", "Delete permission", "permissions"),
    admin(
        "POST",
        "/permissions/{id}/assign-to-role",
        "Assign permission to role",
        "permissions",
    ),
    admin(
        "DELETE",
        "/permissions/{id}/roles/{role_id}",
        "Remove permission from role",
        "permissions",
    ),
    admin(
        "POST",
        "/permissions/{id}/assign-to-user",
        "Assign permission to user",
        "permissions",
    ),
    admin(
        "DELETE",
        "/permissions/{id}/users/{user_id}",
        "Remove permission from user",
        "permissions",
    ),
    admin(
        "POST",
        "/roles/{id}/permissions",
        "Assign permissions to role",
        "roles",
    ),
    admin(
        "DELETE",
        "/roles/{id}/permissions",
        "Remove permissions from role",
        "roles",
    ),
    admin(
        "GET",
        "/permission-templates",
        "List permission templates",
        "permissions",
    ),
    admin(
        "GET",
        "/permission-templates/{id}/preview",
        "Preview permission template",
        "permissions",
    ),
    admin(
        "POST",
        "/permission-templates/apply",
        "Apply permission template",
        "permissions",
    ),
    admin("GET", "/permission-routes", "List route policies", "routes"),
    admin(
        "GET",
        "/permission-routes/{route_key}",
        "Route policy detail",
        "routes",
    ),
    admin(
        "PUT",
        "/permission-routes/{route_key}",
        "Update route policy",
        "routes",
    ),
    admin(
        "POST",
        "/permission-routes/{route_key}/assign-permission",
        "Assign permission to route",
        "routes",
    ),
    admin(
        "DELETE",
        "/permission-routes/{route_key}/permissions/{permission_id}",
        "Remove permission from route",
        "routes",
    ),
];

struct RouteEntry {
    method: &'static str,
    resource: ResourceDef,
    key: RouteKey,
    route: ExposedRoute,
}

/// Exposed routes resolved against a context path
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(context_path: &str) -> Self {
        Self::from_routes(context_path, EXPOSED_ROUTES)
    }

    pub fn from_routes(context_path: &str, routes: &[ExposedRoute]) -> Self {
        let base = context_path.trim_end_matches('/');
        let entries = routes
            .iter()
            .map(|route| RouteEntry {
                method: route.method,
                resource: ResourceDef::new(format!("{}{}", base, route.pattern)),
                key: RouteKey::with_base(route.method, base, route.pattern),
                route: *route,
            })
            .collect();

        Self { entries }
    }

    /// Key of the exposed route matching a concrete request, if any
    pub fn find(&self, method: &str, path: &str) -> Option<&RouteKey> {
        self.entries
            .iter()
            .find(|entry| entry.method.eq_ignore_ascii_case(method) && entry.resource.is_match(path))
            .map(|entry| &entry.key)
    }

    /// Route key for a request; unmatched requests key on their literal path
    pub fn resolve(&self, method: &str, path: &str) -> RouteKey {
        self.find(method, path)
            .cloned()
            .unwrap_or_else(|| RouteKey::new(method, path))
    }

    pub fn keys(&self) -> Vec<RouteKey> {
        self.entries.iter().map(|entry| entry.key.clone()).collect()
    }

    pub fn seeds(&self) -> Vec<RouteSeed> {
        self.entries
            .iter()
            .map(|entry| RouteSeed {
                key: entry.key.clone(),
                name: entry.route.name,
                category: entry.route.category,
                requires_auth: entry.route.requires_auth,
                only_primary_role: entry.route.only_primary_role,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn routes(context_path: &str) -> Scope {
    web::scope(context_path)
        .service(super::auth::my_permissions)
        .service(super::system::health)
        .service(super::system::metrics)
        .service(super::setup::status)
        .service(super::setup::initialize)
        .service(super::template::list)
        .service(super::template::preview)
        .service(super::template::apply)
        .service(super::permission::create)
        .service(super::permission::list)
        .service(super::permission::detail)
        .service(super::permission::update)
        .service(super::permission::delete)
        .service(super::permission::assign_to_role)
        .service(super::permission::remove_from_role)
        .service(super::permission::assign_to_user)
        .service(super::permission::remove_from_user)
        .service(super::role::assign_permissions)
        .service(super::role::remove_permissions)
        .service(super::permission_route::list)
        .service(super::permission_route::detail)
        .service(super::permission_route::update)
        .service(super::permission_route::assign_permission)
        .service(super::permission_route::remove_permission)
}
