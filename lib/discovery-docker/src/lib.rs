//! Docker Engine API client for the container inventory
pub mod client;
pub mod endpoint;
pub mod error;
mod wire;

pub use client::DockerClient;
pub use endpoint::DockerEndpoint;
pub use error::DockerError;
