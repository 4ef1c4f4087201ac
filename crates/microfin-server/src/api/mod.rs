pub mod auth;
pub mod permission;
pub mod permission_route;
pub mod role;
pub mod route;
pub mod setup;
pub mod system;
pub mod template;
