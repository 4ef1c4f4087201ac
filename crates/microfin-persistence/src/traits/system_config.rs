//! System key/value configuration persistence trait

use async_trait::async_trait;

#[async_trait]
pub trait SystemConfigPersistence: Send + Sync {
    async fn config_get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Write `value` only if `key` has no value yet. Returns true if written.
    async fn config_set_if_absent(&self, key: &str, value: &str) -> anyhow::Result<bool>;
}
