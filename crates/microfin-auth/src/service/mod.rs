//! Authorization services

pub mod admin;
pub mod engine;
pub mod identity;
pub mod permission;
pub mod primary_role;
pub mod route;
