//! Role and user grant persistence trait

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::model::{GrantBatchWrite, GrantSource, GrantWrite, PermissionInfo};

#[async_trait]
pub trait GrantPersistence: Send + Sync {
    /// Slugs granted by any of `sources`, optionally restricted to `among`.
    ///
    /// Role and user grants are read in a single statement so both relations
    /// come from the same snapshot.
    async fn grant_find_slugs(
        &self,
        sources: &[GrantSource],
        among: Option<&[String]>,
    ) -> anyhow::Result<BTreeSet<String>>;

    /// Permissions granted to a role
    async fn role_grant_find_by_role(&self, role_id: &str) -> anyhow::Result<Vec<PermissionInfo>>;

    /// Insert a grant unless it exists, checking under the same lock that the
    /// permission row still exists
    async fn role_grant_create(&self, role_id: &str, permission_id: &str)
    -> anyhow::Result<GrantWrite>;

    /// Returns false if the grant did not exist
    async fn role_grant_delete(&self, role_id: &str, permission_id: &str) -> anyhow::Result<bool>;

    /// Insert the missing grants in one transaction. Writes nothing if any
    /// permission row is gone.
    async fn role_grant_create_many(
        &self,
        role_id: &str,
        permission_ids: &[String],
    ) -> anyhow::Result<GrantBatchWrite>;

    /// Delete grants in one transaction; returns the ids actually removed
    async fn role_grant_delete_many(
        &self,
        role_id: &str,
        permission_ids: &[String],
    ) -> anyhow::Result<Vec<String>>;

    async fn user_grant_create(&self, user_id: &str, permission_id: &str)
    -> anyhow::Result<GrantWrite>;

    async fn user_grant_delete(&self, user_id: &str, permission_id: &str) -> anyhow::Result<bool>;
}
