//! JSON bodies of the etcd v2 keys API

use discovery_core::{StoreNode, WatchEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct KeysResponse {
    pub action: String,
    pub node: Option<Node>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Node {
    pub key: Option<String>,
    pub value: Option<String>,
    #[serde(default)]
    pub dir: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub modified_index: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    pub error_code: u64,
    pub message: String,
    #[serde(default)]
    pub cause: String,
}

impl From<Node> for StoreNode {
    fn from(node: Node) -> Self {
        StoreNode {
            key: node.key.unwrap_or_else(|| "/".to_string()),
            value: node.value,
            dir: node.dir,
            nodes: node.nodes.into_iter().map(StoreNode::from).collect(),
            modified_index: node.modified_index,
        }
    }
}

impl KeysResponse {
    pub fn into_watch_event(self) -> Option<WatchEvent> {
        let node = self.node?;
        Some(WatchEvent {
            action: self.action,
            key: node.key.unwrap_or_default(),
            modified_index: node.modified_index,
        })
    }
}
