//! Service definition loading

use crate::service::Service;
use crate::store::CoordinationStore;
use crate::{CoreError, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads service definitions from a directory of the coordination store
pub struct DefinitionStore {
    store: Arc<dyn CoordinationStore>,
    base_path: String,
}

impl DefinitionStore {
    pub fn new(store: Arc<dyn CoordinationStore>, base_path: impl Into<String>) -> Self {
        Self {
            store,
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Create the definitions directory. Failures are not fatal; the
    /// directory usually exists already.
    pub async fn ensure_base(&self) {
        if let Err(e) = self.store.create_dir(&self.base_path).await {
            debug!(basepath = %self.base_path, error = %e, "could not create definitions directory");
        }
    }

    /// Load every definition under the base path.
    ///
    /// Malformed entries are logged and skipped. Only an unreachable store
    /// is reported as an error.
    pub async fn load_all(&self) -> Result<Vec<Service>> {
        let root = match self.store.get(&self.base_path, true).await {
            Ok(root) => root,
            Err(CoreError::KeyNotFound(_)) => {
                warn!(basepath = %self.base_path, "definitions directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut services = Vec::with_capacity(root.nodes.len());
        for node in &root.nodes {
            let key = node.name();
            let Some(value) = node.value.as_deref() else {
                warn!(basepath = %self.base_path, key = %node.key, "service definition is a directory, skipping");
                continue;
            };

            match Service::from_entry(key, value) {
                Ok(service) => services.push(service),
                Err(e) => {
                    warn!(
                        basepath = %self.base_path,
                        key = %node.key,
                        error = %e,
                        "invalid service definition, skipping"
                    );
                }
            }
        }

        debug!(basepath = %self.base_path, count = services.len(), "loaded service definitions");
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    const GOOD: &str = r#"{"NamePattern":"^app-.*","ContainerPort":8080}"#;

    async fn store_with(entries: &[(&str, &str)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (key, value) in entries {
            store
                .set(&format!("/publication/{}", key), value)
                .await
                .unwrap();
        }
        store
    }

    fn keys(services: &[Service]) -> Vec<&str> {
        let mut keys: Vec<&str> = services.iter().map(|s| s.key()).collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_load_all_skips_malformed_entries() {
        let store = store_with(&[
            ("svc1", GOOD),
            ("bad-regex", r#"{"NamePattern":"[","ContainerPort":80}"#),
            ("no-port", r#"{"NamePattern":"web"}"#),
            ("svc2", r#"{"NamePattern":"web","ContainerPort":80}"#),
            ("zero-port", r#"{"NamePattern":"web","ContainerPort":0}"#),
        ])
        .await;

        let defs = DefinitionStore::new(store, "/publication");
        let services = defs.load_all().await.unwrap();
        assert_eq!(keys(&services), vec!["svc1", "svc2"]);
    }

    #[tokio::test]
    async fn test_load_all_independent_of_order() {
        let entries = [
            ("a", GOOD),
            ("b", "garbage"),
            ("c", r#"{"NamePattern":"x","ContainerPort":1}"#),
        ];
        let mut reversed = entries;
        reversed.reverse();

        let forward = DefinitionStore::new(store_with(&entries).await, "/publication")
            .load_all()
            .await
            .unwrap();
        let backward = DefinitionStore::new(store_with(&reversed).await, "/publication")
            .load_all()
            .await
            .unwrap();
        assert_eq!(keys(&forward), keys(&backward));
        assert_eq!(keys(&forward), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_nested_directories_are_skipped() {
        let store = store_with(&[("svc1", GOOD), ("group/svc2", GOOD)]).await;
        let services = DefinitionStore::new(store, "/publication")
            .load_all()
            .await
            .unwrap();
        assert_eq!(keys(&services), vec!["svc1"]);
    }

    #[tokio::test]
    async fn test_missing_directory_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        let services = DefinitionStore::new(store, "/publication")
            .load_all()
            .await
            .unwrap();
        assert!(services.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_an_error() {
        let store = store_with(&[("svc1", GOOD)]).await;
        store.set_unavailable(true);
        let defs = DefinitionStore::new(store, "/publication");
        assert!(matches!(defs.load_all().await, Err(CoreError::Store(_))));
    }

    #[tokio::test]
    async fn test_ensure_base_creates_directory() {
        let store = Arc::new(MemoryStore::new());
        let defs = DefinitionStore::new(store.clone(), "/publication");
        defs.ensure_base().await;
        defs.ensure_base().await;
        assert!(defs.load_all().await.unwrap().is_empty());
        assert!(store.get("/publication", false).await.unwrap().dir);
    }
}
