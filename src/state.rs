//! Application state
//!
//! Configuration and the shared components built from it

use crate::config_store::{ConfigStore, PANEL_API_KEY, PANEL_SECTION};
use crate::error::{Error, Result};
use crate::panel_client::{
    PanelClient, RequestDispatcher, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT,
};
use crate::server_registry::{RegistryReconciler, ServerRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Panel API base URL
    pub panel_base_url: String,
    /// Panel token; falls back to `panel.APIKey` in the store
    pub panel_api_key: Option<String>,
    /// SQLite database URL
    pub database_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Run the periodic sync loop instead of a single pass
    pub sync_interval: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

impl AppConfig {
    /// Build from a variable lookup (the process environment by default)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            panel_base_url: non_empty("PANEL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            panel_api_key: non_empty("PANEL_API_KEY"),
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://serversage_config.db?mode=rwc".to_string()),
            request_timeout: non_empty("REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            sync_interval: non_empty("SYNC_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }

    /// Panel token from the config, else from the store
    pub async fn resolve_api_key(&self, store: &dyn ConfigStore) -> Result<String> {
        if let Some(key) = &self.panel_api_key {
            return Ok(key.clone());
        }

        match store.get(PANEL_SECTION, PANEL_API_KEY).await? {
            Some(Value::String(key)) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::Config(format!(
                "No panel API key: set PANEL_API_KEY or {}.{}",
                PANEL_SECTION, PANEL_API_KEY
            ))),
        }
    }
}

/// Shared components
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// ConfigStore
    pub store: Arc<dyn ConfigStore>,
    /// Panel session owner
    pub dispatcher: Arc<RequestDispatcher>,
    /// Typed panel endpoints
    pub client: PanelClient,
    /// Registry lookups
    pub registry: ServerRegistry,
    /// Registry reconciliation
    pub reconciler: Arc<RegistryReconciler>,
}

impl AppState {
    pub async fn build(config: AppConfig, store: Arc<dyn ConfigStore>) -> Result<Self> {
        let api_key = config.resolve_api_key(store.as_ref()).await?;

        let dispatcher = Arc::new(
            RequestDispatcher::new(config.panel_base_url.clone(), api_key)
                .with_timeout(config.request_timeout),
        );
        let client = PanelClient::new(dispatcher.clone());
        let registry = ServerRegistry::new(store.clone());
        let reconciler = Arc::new(RegistryReconciler::new(
            Arc::new(client.clone()),
            registry.clone(),
        ));

        Ok(Self {
            config,
            store,
            dispatcher,
            client,
            registry,
            reconciler,
        })
    }

    /// Release the panel session
    pub async fn shutdown(&self) {
        self.dispatcher.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::MemoryConfigStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.panel_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(config.panel_api_key.is_none());
        assert!(config.sync_interval.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PANEL_BASE_URL", "http://localhost:9000/api"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("SYNC_INTERVAL_SECS", "900"),
            ("PANEL_API_KEY", " "),
        ]);
        assert_eq!(config.panel_base_url, "http://localhost:9000/api");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.sync_interval, Some(Duration::from_secs(900)));
        assert!(config.panel_api_key.is_none());
    }

    #[tokio::test]
    async fn test_api_key_resolution() {
        let store = MemoryConfigStore::new();

        let err = config(&[]).resolve_api_key(&store).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        store.set("panel", "APIKey", json!("from-store")).await.unwrap();
        assert_eq!(config(&[]).resolve_api_key(&store).await.unwrap(), "from-store");

        let env = config(&[("PANEL_API_KEY", "from-env")]);
        assert_eq!(env.resolve_api_key(&store).await.unwrap(), "from-env");
    }

    #[tokio::test]
    async fn test_build_wires_components() {
        let store: Arc<dyn ConfigStore> = Arc::new(MemoryConfigStore::new());
        let state = AppState::build(config(&[("PANEL_API_KEY", "k")]), store)
            .await
            .unwrap();

        assert_eq!(state.dispatcher.base_url(), DEFAULT_BASE_URL);
        assert!(state.registry.list().await.unwrap().is_empty());
        state.shutdown().await;
    }
}
