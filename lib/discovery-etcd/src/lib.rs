//! etcd v2 coordination store client
pub mod client;
pub mod error;
mod wire;

pub use client::EtcdClient;
pub use error::EtcdError;
