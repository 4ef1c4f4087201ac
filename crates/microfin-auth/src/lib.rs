//! Microfin Auth - Identity resolution and route authorization
//!
//! This crate provides:
//! - Bearer token verification and subject resolution
//! - The route decision engine and its permission primitives
//! - Primary role resolution with a TTL cache
//! - Policy administration with audit recording

pub mod error;
pub mod model;
pub mod service;

// Re-export commonly used types
pub use error::{AdminError, AuthError};
pub use model::*;
pub use service::admin::PolicyAdministration;
pub use service::engine::DecisionEngine;
pub use service::identity::{
    IdentityResolver, JwtTokenVerifier, TokenClaims, TokenVerifier, extract_bearer_token,
};
pub use service::permission::PermissionStore;
pub use service::primary_role::PrimaryRoleResolver;
pub use service::route::RouteRegistry;
