//! Microfin Persistence - Database entities and persistence layer
//!
//! This crate provides:
//! - SeaORM entity definitions for the authorization schema
//! - Persistence trait abstractions for unified storage
//! - Domain model types for persistence operations
//! - An external database backend and an in-process backend

pub mod entity;
pub mod memory;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export entity prelude
pub use entity::prelude::*;

// Re-export persistence traits
pub use traits::{
    AccountPersistence, AuditPersistence, GrantPersistence, PermissionPersistence,
    PersistenceService, RoutePersistence, SystemConfigPersistence,
};

// Re-export SQL backend
pub use sql::ExternalDbPersistService;

// Re-export in-process backend
pub use memory::MemoryPersistService;

// Re-export model types
pub use model::{
    AccountInfo, AccountStatus, AuditAction, AuditEntry, GrantBatchWrite, GrantSource, GrantWrite,
    NewPermission, NewRoutePolicy, PermissionChanges, PermissionDeletion, PermissionDetail, PermissionInfo,
    RoleInfo, RouteConfigChanges, RouteConfigUpdate, RouteGrantWrite, RoutePolicyRecord,
    StorageMode, UsageCounts,
};
