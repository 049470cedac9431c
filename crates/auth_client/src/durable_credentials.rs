use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use credentials::CredentialStore;

use crate::CredentialCache;

/// Credential cache backed by the sqlite jar in the `credentials`
/// crate; the expiry and secure-flag policy lives there.
pub struct DurableCredentialCache {
    store: CredentialStore,
}

impl DurableCredentialCache {
    pub async fn initialize(database_url: &str) -> Result<Arc<Self>> {
        let store = CredentialStore::new(database_url)
            .await
            .with_context(|| format!("failed to initialize credential store at '{database_url}'"))?;
        Ok(Arc::new(Self { store }))
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn sqlite_url_for_data_dir(base_dir: &Path) -> String {
        credentials::sqlite_url_for_data_dir(base_dir)
    }
}

#[async_trait]
impl CredentialCache for DurableCredentialCache {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        self.store.get(name).await
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        self.store.set(name, value).await
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.store.remove(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn durable_cache_round_trips_through_sqlite() {
        let cache = DurableCredentialCache::initialize("sqlite::memory:")
            .await
            .expect("cache");

        cache
            .set(credentials::AUTH_TOKEN, "tok-42")
            .await
            .expect("set");
        assert_eq!(
            cache
                .get(credentials::AUTH_TOKEN)
                .await
                .expect("get")
                .as_deref(),
            Some("tok-42")
        );

        cache
            .remove(credentials::AUTH_TOKEN)
            .await
            .expect("remove");
        assert!(cache
            .get(credentials::AUTH_TOKEN)
            .await
            .expect("get")
            .is_none());
    }

    #[tokio::test]
    async fn sqlite_url_helper_points_into_data_dir() {
        let url = DurableCredentialCache::sqlite_url_for_data_dir(Path::new("/tmp/foyer"));
        assert_eq!(url, "sqlite:///tmp/foyer/credentials.sqlite3");
    }
}
