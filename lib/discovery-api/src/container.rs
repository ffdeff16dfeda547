//! Container inventory snapshot
use serde::{Deserialize, Serialize};

/// A single published port of a container.
///
/// `public_port` is whatever the runtime reported. Docker omits it for
/// ports that are only exposed internally and may report 0 for the same
/// situation, so it is not narrowed to `u16` here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub private_port: u16,
    pub public_port: Option<i64>,
}

/// A running container. Rebuilt from scratch on every poll.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInstance {
    pub id: String,
    pub names: Vec<String>,
    pub ports: Vec<PortMapping>,
}

impl ContainerInstance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn with_port(mut self, private_port: u16, public_port: Option<i64>) -> Self {
        self.ports.push(PortMapping {
            private_port,
            public_port,
        });
        self
    }
}
