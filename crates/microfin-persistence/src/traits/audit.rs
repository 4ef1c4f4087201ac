//! Audit sink

use async_trait::async_trait;

use crate::model::AuditEntry;

#[async_trait]
pub trait AuditPersistence: Send + Sync {
    /// Append one entry. Entries are never updated or removed.
    async fn audit_append(&self, entry: AuditEntry) -> anyhow::Result<()>;
}
