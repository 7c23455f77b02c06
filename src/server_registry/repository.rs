//! Server registry reads over the ConfigStore

use super::types::*;
use crate::config_store::ConfigStore;
use std::sync::Arc;

/// Read access to the persisted `server_*` sections
#[derive(Clone)]
pub struct ServerRegistry {
    store: Arc<dyn ConfigStore>,
}

impl ServerRegistry {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Load every registry section, separating sections without an id
    pub async fn load(&self) -> crate::Result<LocalRegistry> {
        let mut registry = LocalRegistry::default();

        for section in self.store.all_sections().await? {
            if !is_server_section(&section) {
                continue;
            }
            let keys = self.store.get_section(&section).await?;
            match ServerRecord::from_section(&section, &keys) {
                Some(record) => registry.records.push(record),
                None => registry.malformed.push(section),
            }
        }

        Ok(registry)
    }

    /// Registry entries ordered by ordinal key
    pub async fn list(&self) -> crate::Result<Vec<ServerSummary>> {
        let mut records = self.load().await?.records;
        sort_by_ordinal(&mut records);
        Ok(records.iter().map(ServerRecord::summary).collect())
    }

    /// Entries not flagged hidden
    pub async fn visible(&self) -> crate::Result<Vec<ServerSummary>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|s| !s.hidden)
            .collect())
    }

    /// Resolve by remote id, then by display name (both case-insensitive)
    pub async fn find(&self, query: &str) -> crate::Result<ServerSummary> {
        let query = query.trim();
        let servers = self.list().await?;

        servers
            .iter()
            .find(|s| s.remote_id.eq_ignore_ascii_case(query))
            .or_else(|| servers.iter().find(|s| s.name.eq_ignore_ascii_case(query)))
            .cloned()
            .ok_or_else(|| crate::Error::NotFound(format!("Server not found: {}", query)))
    }

    /// Hidden flag of a remote id (case-insensitive); unknown ids are not hidden
    pub async fn is_hidden(&self, remote_id: &str) -> crate::Result<bool> {
        Ok(self
            .list()
            .await?
            .iter()
            .any(|s| s.remote_id.eq_ignore_ascii_case(remote_id) && s.hidden))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::{MemoryConfigStore, SectionMap};
    use serde_json::json;

    fn section(id: &str, name: &str, hide: bool) -> SectionMap {
        [
            ("id".to_string(), json!(id)),
            ("name".to_string(), json!(name)),
            ("hide".to_string(), json!(hide)),
        ]
        .into_iter()
        .collect()
    }

    fn registry() -> ServerRegistry {
        let store = MemoryConfigStore::with_sections([
            ("panel".to_string(), [("APIKey".to_string(), json!("k"))].into_iter().collect()),
            ("server_10".to_string(), section("zz99", "Modded", false)),
            ("server_2".to_string(), section("ab12", "Survival", true)),
            ("server_3".to_string(), [("name".to_string(), json!("orphan"))].into_iter().collect()),
        ]);
        ServerRegistry::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_load_splits_malformed() {
        let loaded = registry().load().await.unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.malformed, vec!["server_3".to_string()]);
    }

    #[tokio::test]
    async fn test_list_orders_numerically() {
        let keys: Vec<_> = registry()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.local_key)
            .collect();
        assert_eq!(keys, vec!["server_2", "server_10"]);
    }

    #[tokio::test]
    async fn test_find_by_id_or_name() {
        let registry = registry();
        assert_eq!(registry.find("AB12").await.unwrap().name, "Survival");
        assert_eq!(registry.find(" modded ").await.unwrap().remote_id, "zz99");
        assert!(matches!(
            registry.find("nope").await,
            Err(crate::Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_hidden_and_visible() {
        let registry = registry();
        assert!(registry.is_hidden("AB12").await.unwrap());
        assert!(!registry.is_hidden("zz99").await.unwrap());
        assert!(!registry.is_hidden("unknown").await.unwrap());

        let visible = registry.visible().await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].remote_id, "zz99");
    }
}
