//! Primary role resolution
//!
//! The primary role id is written once during system setup and read on every
//! authenticated request. It is either pinned from configuration or read from
//! the system config store through a TTL cache that setup busts explicitly.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use microfin_common::PRIMARY_ROLE_CONFIG_KEY;
use microfin_persistence::PersistenceService;

enum Source {
    Fixed(Option<String>),
    Store(Arc<dyn PersistenceService>),
}

pub struct PrimaryRoleResolver {
    source: Source,
    cache: Cache<&'static str, Option<String>>,
}

impl PrimaryRoleResolver {
    /// Resolver backed by the system config store
    pub fn from_store(persistence: Arc<dyn PersistenceService>, ttl: Duration) -> Self {
        Self {
            source: Source::Store(persistence),
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Resolver returning a pinned value; `None` means no primary role
    pub fn fixed(role_id: Option<String>) -> Self {
        Self {
            source: Source::Fixed(role_id),
            cache: Cache::builder().max_capacity(1).build(),
        }
    }

    pub async fn primary_role_id(&self) -> anyhow::Result<Option<String>> {
        match &self.source {
            Source::Fixed(role_id) => Ok(role_id.clone()),
            Source::Store(persistence) => {
                if let Some(cached) = self.cache.get(PRIMARY_ROLE_CONFIG_KEY) {
                    return Ok(cached);
                }

                let role_id = persistence
                    .config_get(PRIMARY_ROLE_CONFIG_KEY)
                    .await?
                    .filter(|v| !v.is_empty());

                self.cache.insert(PRIMARY_ROLE_CONFIG_KEY, role_id.clone());

                Ok(role_id)
            }
        }
    }

    /// False while no primary role is configured
    pub async fn is_primary(&self, role_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .primary_role_id()
            .await?
            .is_some_and(|primary| primary == role_id))
    }

    /// Drop the cached value so the next read hits the store
    pub fn invalidate(&self) {
        self.cache.invalidate(PRIMARY_ROLE_CONFIG_KEY);
    }

    /// Whether the value is pinned by configuration and cannot be initialized at runtime
    pub fn is_fixed(&self) -> bool {
        matches!(self.source, Source::Fixed(_))
    }
}
