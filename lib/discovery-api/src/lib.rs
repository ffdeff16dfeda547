//! Data types shared by the discovery agent
//!
//! This library defines the records the agent reads and writes:
//! - ServiceDefinition: declares how to recognize a class of containers
//! - ContainerInstance: a running container as reported by the runtime
//! - Backend / Server: routing records consumed by vulcand

pub mod container;
pub mod definition;
pub mod registry;

pub use container::{ContainerInstance, PortMapping};
pub use definition::ServiceDefinition;
pub use registry::{Backend, RegistryLayout, Server};
