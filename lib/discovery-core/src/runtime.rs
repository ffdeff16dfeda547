//! Container runtime interface

use crate::Result;
use async_trait::async_trait;
use discovery_api::ContainerInstance;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List running containers with their published ports
    async fn list_containers(&self) -> Result<Vec<ContainerInstance>>;
}
