//! vulcand routing records and their location in the coordination store
use serde::{Deserialize, Serialize};

/// Backend record, stored at `<base>/backends/<service>/backend`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    #[serde(rename = "Type")]
    pub kind: String,
}

impl Backend {
    pub fn http() -> Self {
        Self {
            kind: "http".to_string(),
        }
    }
}

/// Server record, stored at `<base>/backends/<service>/servers/<instance>`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    #[serde(rename = "URL")]
    pub url: String,
}

impl Server {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            url: format!("http://{}:{}", host, port),
        }
    }
}

/// Key layout of the routing records under a base path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryLayout {
    base: String,
}

impl RegistryLayout {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn backend_key(&self, service_key: &str) -> String {
        format!("{}/backends/{}/backend", self.base, service_key)
    }

    pub fn server_key(&self, service_key: &str, instance_name: &str) -> String {
        format!("{}/backends/{}/servers/{}", self.base, service_key, instance_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_encoding() {
        assert_eq!(
            serde_json::to_string(&Backend::http()).unwrap(),
            r#"{"Type":"http"}"#
        );
    }

    #[test]
    fn test_server_encoding() {
        let server = Server::new("node-1.internal", 33000);
        assert_eq!(
            serde_json::to_string(&server).unwrap(),
            r#"{"URL":"http://node-1.internal:33000"}"#
        );
    }

    #[test]
    fn test_layout_keys() {
        let layout = RegistryLayout::new("/vulcand/");
        assert_eq!(layout.backend_key("svc1"), "/vulcand/backends/svc1/backend");
        assert_eq!(
            layout.server_key("svc1", "app-1"),
            "/vulcand/backends/svc1/servers/app-1"
        );
    }
}
