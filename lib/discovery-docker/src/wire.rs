//! JSON bodies of the Docker Engine API

use discovery_api::{ContainerInstance, PortMapping};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiContainer {
    pub id: String,
    pub names: Option<Vec<String>>,
    pub ports: Option<Vec<ApiPort>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiPort {
    pub private_port: u16,
    pub public_port: Option<i64>,
}

impl From<ApiContainer> for ContainerInstance {
    fn from(c: ApiContainer) -> Self {
        ContainerInstance {
            id: c.id,
            names: c.names.unwrap_or_default(),
            ports: c
                .ports
                .unwrap_or_default()
                .into_iter()
                .map(|p| PortMapping {
                    private_port: p.private_port,
                    public_port: p.public_port,
                })
                .collect(),
        }
    }
}
