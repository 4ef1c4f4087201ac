//! SeaORM entity definitions for the authorization schema

pub mod audit_log;
pub mod permissions;
pub mod role_permissions;
pub mod roles;
pub mod route_permission_map;
pub mod route_permissions;
pub mod system_config;
pub mod user_permissions;
pub mod users;

pub mod prelude {
    pub use super::audit_log::Entity as AuditLog;
    pub use super::permissions::Entity as Permissions;
    pub use super::role_permissions::Entity as RolePermissions;
    pub use super::roles::Entity as Roles;
    pub use super::route_permission_map::Entity as RoutePermissionMap;
    pub use super::route_permissions::Entity as RoutePermissions;
    pub use super::system_config::Entity as SystemConfig;
    pub use super::user_permissions::Entity as UserPermissions;
    pub use super::users::Entity as Users;
}
