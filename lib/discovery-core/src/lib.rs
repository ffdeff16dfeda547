//! Core reconciliation engine of the discovery agent
//!
//! This library provides:
//! - Service definition loading and name matching
//! - Published port resolution
//! - Registry publication of vulcand backends and servers
//! - The definitions watch and the reconciliation loop driving it all

pub mod backoff;
pub mod config;
pub mod definitions;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod metrics;
pub mod ports;
pub mod publisher;
pub mod reconciler;
pub mod runtime;
pub mod service;
pub mod store;
pub mod watch;

pub use backoff::{Backoff, ExponentialBackoff};
pub use config::DiscoveryConfig;
pub use definitions::DefinitionStore;
pub use error::{CoreError, Result};
pub use metrics::DiscoveryMetrics;
pub use ports::{resolve_port, NotExposed};
pub use publisher::RegistryPublisher;
pub use reconciler::{PassSummary, Reconciler, Trigger};
pub use runtime::ContainerRuntime;
pub use service::{instance_name, Service};
pub use store::{CoordinationStore, StoreNode, WatchEvent};
pub use watch::{ChangeFeed, WatchSubscriber};
