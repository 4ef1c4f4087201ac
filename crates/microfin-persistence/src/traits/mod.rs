//! Persistence traits for the unified storage abstraction layer
//!
//! This module defines the core persistence traits that abstract over different
//! storage backends: external database (MySQL/PostgreSQL) and in-process memory.

pub mod account;
pub mod audit;
pub mod grant;
pub mod permission;
pub mod route;
pub mod system_config;

pub use account::AccountPersistence;
pub use audit::AuditPersistence;
pub use grant::GrantPersistence;
pub use permission::PermissionPersistence;
pub use route::RoutePersistence;
pub use system_config::SystemConfigPersistence;

use async_trait::async_trait;

use crate::model::StorageMode;

/// Unified persistence service trait
///
/// This is the main interface for all storage operations. Implementations
/// dispatch to the appropriate storage backend based on the configured mode.
#[async_trait]
pub trait PersistenceService:
    AccountPersistence
    + PermissionPersistence
    + GrantPersistence
    + RoutePersistence
    + SystemConfigPersistence
    + AuditPersistence
    + Send
    + Sync
{
    /// Get the current storage mode
    fn storage_mode(&self) -> StorageMode;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}
