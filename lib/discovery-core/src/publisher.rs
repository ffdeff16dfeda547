//! Publishes vulcand backend and server records

use crate::service::Service;
use crate::store::CoordinationStore;
use crate::Result;
use discovery_api::{Backend, RegistryLayout, Server};
use std::sync::Arc;
use tracing::debug;

/// Writes routing records. Every write is a plain upsert, so publishing
/// the same record twice leaves the store unchanged.
pub struct RegistryPublisher {
    store: Arc<dyn CoordinationStore>,
    layout: RegistryLayout,
}

impl RegistryPublisher {
    pub fn new(store: Arc<dyn CoordinationStore>, routing_path: &str) -> Self {
        Self {
            store,
            layout: RegistryLayout::new(routing_path),
        }
    }

    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    /// Upsert the backend of a service
    pub async fn publish_backend(&self, service: &Service) -> Result<()> {
        let key = self.layout.backend_key(service.key());
        let value = serde_json::to_string(&Backend::http())?;
        self.store.set(&key, &value).await?;
        debug!(service = %service.key(), key = %key, "published backend");
        Ok(())
    }

    /// Upsert one server of a service
    pub async fn publish_server(
        &self,
        service: &Service,
        instance_name: &str,
        host: &str,
        port: u16,
    ) -> Result<()> {
        let key = self.layout.server_key(service.key(), instance_name);
        let value = serde_json::to_string(&Server::new(host, port))?;
        self.store.set(&key, &value).await?;
        debug!(service = %service.key(), key = %key, port, "published server");
        Ok(())
    }
}
