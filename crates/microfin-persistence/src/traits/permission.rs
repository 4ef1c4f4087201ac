//! Permission catalog persistence trait

use std::collections::HashMap;

use async_trait::async_trait;

use crate::model::{
    NewPermission, PermissionChanges, PermissionDeletion, PermissionDetail, PermissionInfo,
    UsageCounts,
};

#[async_trait]
pub trait PermissionPersistence: Send + Sync {
    async fn permission_find_by_id(&self, id: &str) -> anyhow::Result<Option<PermissionInfo>>;

    async fn permission_find_by_slug(&self, slug: &str) -> anyhow::Result<Option<PermissionInfo>>;

    /// Registered permissions among the given slugs
    async fn permission_find_by_slugs(
        &self,
        slugs: &[String],
    ) -> anyhow::Result<Vec<PermissionInfo>>;

    /// All permissions ordered by category, then slug
    async fn permission_find_all(&self) -> anyhow::Result<Vec<PermissionInfo>>;

    /// Grant usage counts keyed by permission id; unused permissions may be absent
    async fn permission_usage_counts(&self) -> anyhow::Result<HashMap<String, UsageCounts>>;

    async fn permission_create(&self, permission: NewPermission) -> anyhow::Result<PermissionInfo>;

    /// Apply changes; returns `None` if the permission does not exist
    async fn permission_update(
        &self,
        id: &str,
        changes: PermissionChanges,
    ) -> anyhow::Result<Option<PermissionInfo>>;

    /// Count references and delete in one transaction
    async fn permission_delete_if_unused(&self, id: &str) -> anyhow::Result<PermissionDeletion>;

    async fn permission_detail(&self, id: &str) -> anyhow::Result<Option<PermissionDetail>>;
}
