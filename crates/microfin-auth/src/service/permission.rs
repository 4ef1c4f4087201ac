//! Permission store
//!
//! Read-side checks over role and user grants. Both grant relations are read
//! through one `grant_find_slugs` call, so a check never mixes two snapshots.
//! Primary-role handling belongs to the callers.

use std::collections::BTreeSet;
use std::sync::Arc;

use microfin_persistence::{GrantSource, PersistenceService};

#[derive(Clone)]
pub struct PermissionStore {
    persistence: Arc<dyn PersistenceService>,
}

fn sources(subject_id: &str, role_id: &str) -> [GrantSource; 2] {
    [
        GrantSource::Role(role_id.to_string()),
        GrantSource::User(subject_id.to_string()),
    ]
}

impl PermissionStore {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        Self { persistence }
    }

    /// Union of role grants and direct user grants
    pub async fn list_permissions_for_subject(
        &self,
        subject_id: &str,
        role_id: &str,
    ) -> anyhow::Result<BTreeSet<String>> {
        self.persistence
            .grant_find_slugs(&sources(subject_id, role_id), None)
            .await
    }

    /// True if the subject holds at least one of `required`
    pub async fn has_any_permission(
        &self,
        subject_id: &str,
        role_id: &str,
        required: &[String],
    ) -> anyhow::Result<bool> {
        if required.is_empty() {
            return Ok(false);
        }

        let held = self
            .persistence
            .grant_find_slugs(&sources(subject_id, role_id), Some(required))
            .await?;

        Ok(!held.is_empty())
    }

    /// Required slugs the subject does not hold
    pub async fn missing_permissions(
        &self,
        subject_id: &str,
        role_id: &str,
        required: &[String],
    ) -> anyhow::Result<Vec<String>> {
        if required.is_empty() {
            return Ok(Vec::new());
        }

        let held = self
            .persistence
            .grant_find_slugs(&sources(subject_id, role_id), Some(required))
            .await?;

        let mut seen = BTreeSet::new();
        let missing = required
            .iter()
            .filter(|slug| !held.contains(*slug) && seen.insert(slug.as_str()))
            .cloned()
            .collect();

        Ok(missing)
    }

    /// True if the subject holds every slug in `required`
    pub async fn has_all_permissions(
        &self,
        subject_id: &str,
        role_id: &str,
        required: &[String],
    ) -> anyhow::Result<bool> {
        Ok(self
            .missing_permissions(subject_id, role_id, required)
            .await?
            .is_empty())
    }

    /// Slugs among `slugs` that exist in the catalog
    pub async fn registered(&self, slugs: &[String]) -> anyhow::Result<Vec<String>> {
        Ok(self
            .persistence
            .permission_find_by_slugs(slugs)
            .await?
            .into_iter()
            .map(|p| p.slug)
            .collect())
    }

    /// Every slug in the catalog
    pub async fn all_slugs(&self) -> anyhow::Result<BTreeSet<String>> {
        Ok(self
            .persistence
            .permission_find_all()
            .await?
            .into_iter()
            .map(|p| p.slug)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microfin_persistence::{
        GrantPersistence, MemoryPersistService, NewPermission, PermissionPersistence,
    };

    async fn setup() -> (Arc<MemoryPersistService>, PermissionStore) {
        let store = Arc::new(MemoryPersistService::new());
        for slug in ["roles.view", "roles.manage", "users.manage"] {
            let permission = store
                .permission_create(NewPermission {
                    slug: slug.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
            match slug {
                "roles.view" => {
                    store.role_grant_create("auditor", &permission.id).await.unwrap();
                }
                "users.manage" => {
                    store.user_grant_create("u-1", &permission.id).await.unwrap();
                }
                _ => {}
            }
        }
        (store.clone(), PermissionStore::new(store))
    }

    #[tokio::test]
    async fn test_union_of_role_and_user_grants() {
        let (_, permissions) = setup().await;
        let held = permissions
            .list_permissions_for_subject("u-1", "auditor")
            .await
            .unwrap();
        assert_eq!(
            held.into_iter().collect::<Vec<_>>(),
            vec!["roles.view".to_string(), "users.manage".to_string()]
        );
    }

    #[tokio::test]
    async fn test_any_and_all() {
        let (_, permissions) = setup().await;
        let required = vec!["roles.view".to_string(), "roles.manage".to_string()];

        assert!(
            permissions
                .has_any_permission("u-1", "auditor", &required)
                .await
                .unwrap()
        );
        assert!(
            !permissions
                .has_all_permissions("u-1", "auditor", &required)
                .await
                .unwrap()
        );
        assert_eq!(
            permissions
                .missing_permissions("u-1", "auditor", &required)
                .await
                .unwrap(),
            vec!["roles.manage".to_string()]
        );
        assert!(
            !permissions
                .has_any_permission("u-2", "clerk", &required)
                .await
                .unwrap()
        );
        assert!(
            !permissions
                .has_any_permission("u-1", "auditor", &[])
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_permissions_reports_each_slug_once() {
        let (_, permissions) = setup().await;
        let required = vec![
            "roles.manage".to_string(),
            "loans.view".to_string(),
            "roles.view".to_string(),
            "roles.manage".to_string(),
        ];

        assert_eq!(
            permissions
                .missing_permissions("u-1", "auditor", &required)
                .await
                .unwrap(),
            vec!["roles.manage".to_string(), "loans.view".to_string()]
        );
    }

    #[tokio::test]
    async fn test_registered_filters_unknown_slugs() {
        let (_, permissions) = setup().await;
        let registered = permissions
            .registered(&["roles.view".to_string(), "loans.approve".to_string()])
            .await
            .unwrap();
        assert_eq!(registered, vec!["roles.view".to_string()]);
    }
}
