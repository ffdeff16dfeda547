//! Coordination store interface
//!
//! The agent only needs four operations from the store. They are modelled
//! after the etcd v2 keys API, which is what vulcand reads its routing
//! configuration from.

use crate::Result;
use async_trait::async_trait;

/// A node of the coordination store key tree
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreNode {
    pub key: String,
    pub value: Option<String>,
    pub dir: bool,
    pub nodes: Vec<StoreNode>,
    pub modified_index: u64,
}

impl StoreNode {
    /// Last path segment of the key
    pub fn name(&self) -> &str {
        self.key
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

/// A change observed by a watch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    pub action: String,
    pub key: String,
    pub modified_index: u64,
}

#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Read a node and, for directories, its children
    async fn get(&self, path: &str, recursive: bool) -> Result<StoreNode>;

    /// Create a directory node
    async fn create_dir(&self, path: &str) -> Result<()>;

    /// Block until a change happens at or below `path`.
    ///
    /// With `after_index` set, events with a modified index greater than or
    /// equal to it are returned even if they happened before the call.
    async fn watch(&self, path: &str, recursive: bool, after_index: Option<u64>)
        -> Result<WatchEvent>;

    /// Create or overwrite a value
    async fn set(&self, path: &str, value: &str) -> Result<()>;
}
