//! Microfin Server - HTTP surface of the route authorization service
//!
//! This crate provides:
//! - Authentication and route access middleware
//! - Permission, role grant and route policy administration endpoints
//! - Configuration, logging, metrics and startup provisioning

pub mod api;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod model;
pub mod startup;

pub use error::AppError;
pub use model::{AppState, Configuration};
