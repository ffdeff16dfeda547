//! Published port lookup

use discovery_api::ContainerInstance;
use thiserror::Error;

/// Why a container port cannot be routed to
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotExposed {
    #[error("no mapping for the container port")]
    NoMapping,

    #[error("port is not published on the host (public port {0})")]
    Unpublished(i64),
}

/// Find the host port a container port is published on.
///
/// A mapping whose public port is missing or outside 1..=65535 counts as
/// not exposed: docker reports 0 for ports reserved but not published.
pub fn resolve_port(container: &ContainerInstance, container_port: u16) -> Result<u16, NotExposed> {
    let mapping = container
        .ports
        .iter()
        .find(|m| m.private_port == container_port)
        .ok_or(NotExposed::NoMapping)?;

    let public = mapping.public_port.unwrap_or(0);
    u16::try_from(public)
        .ok()
        .filter(|port| *port > 0)
        .ok_or(NotExposed::Unpublished(public))
}
