pub mod auth;
pub mod route_access;

pub use auth::{AuthContext, Authentication};
pub use route_access::{AuthenticatedSubject, PrimarySubject, RouteAccess};
