//! Account and role lookups used by the identity layer

use async_trait::async_trait;

use crate::model::{AccountInfo, RoleInfo};

#[async_trait]
pub trait AccountPersistence: Send + Sync {
    /// Find an account by id, including its role. Soft-deleted accounts are returned
    /// with `deleted = true`.
    async fn account_find_by_id(&self, id: &str) -> anyhow::Result<Option<AccountInfo>>;

    /// Find a role by id
    async fn role_find_by_id(&self, id: &str) -> anyhow::Result<Option<RoleInfo>>;

    /// Find the roles whose names are in `names`
    async fn role_find_by_names(&self, names: &[String]) -> anyhow::Result<Vec<RoleInfo>>;
}
