//! HTTP client for the etcd v2 keys API

use crate::error::{EtcdError, NODE_EXISTS, NOT_A_FILE};
use crate::wire::{ErrorBody, KeysResponse};
use async_trait::async_trait;
use discovery_core::{CoordinationStore, StoreNode, WatchEvent};
use reqwest::{Client, RequestBuilder, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// etcd client over one or more cluster members.
///
/// Every request goes to the first member that answers. Watches are long
/// polls and run without the request timeout.
pub struct EtcdClient {
    http: Client,
    endpoints: Vec<Url>,
    timeout: Duration,
}

impl EtcdClient {
    pub fn new(endpoints: &[String], timeout: Duration) -> Result<Self, EtcdError> {
        if endpoints.is_empty() {
            return Err(EtcdError::NoEndpoints);
        }

        let endpoints = endpoints
            .iter()
            .map(|e| {
                let url = Url::parse(e.trim()).map_err(|_| EtcdError::InvalidEndpoint(e.clone()))?;
                match url.scheme() {
                    "http" | "https" => Ok(url),
                    _ => Err(EtcdError::InvalidEndpoint(e.clone())),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let http = Client::builder().connect_timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoints,
            timeout,
        })
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    fn keys_url(endpoint: &Url, path: &str) -> String {
        format!(
            "{}/v2/keys/{}",
            endpoint.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send<F>(&self, path: &str, build: F) -> Result<KeysResponse, EtcdError>
    where
        F: Fn(&Client, String) -> RequestBuilder,
    {
        let mut last_error = String::new();
        for endpoint in &self.endpoints {
            let url = Self::keys_url(endpoint, path);
            match build(&self.http, url).send().await {
                Ok(resp) => return Self::decode(resp).await,
                Err(e) => {
                    debug!(endpoint = %endpoint, error = %e, "etcd endpoint unreachable");
                    last_error = e.to_string();
                }
            }
        }
        Err(EtcdError::Unreachable(last_error))
    }

    async fn decode(resp: reqwest::Response) -> Result<KeysResponse, EtcdError> {
        let status = resp.status();
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Err(EtcdError::Protocol(format!("empty response (status {})", status)));
        }

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| EtcdError::Protocol(e.to_string()));
        }

        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => Err(EtcdError::Api {
                code: err.error_code,
                message: err.message,
                cause: err.cause,
            }),
            Err(_) => Err(EtcdError::Protocol(format!("status {}: {}", status, body.trim()))),
        }
    }
}

#[async_trait]
impl CoordinationStore for EtcdClient {
    async fn get(&self, path: &str, recursive: bool) -> discovery_core::Result<StoreNode> {
        let timeout = self.timeout;
        let resp = self
            .send(path, |http, url| {
                http.get(url)
                    .query(&[("recursive", recursive)])
                    .timeout(timeout)
            })
            .await?;
        let node = resp
            .node
            .ok_or_else(|| EtcdError::Protocol("get response without node".to_string()))?;
        Ok(node.into())
    }

    async fn create_dir(&self, path: &str) -> discovery_core::Result<()> {
        let timeout = self.timeout;
        let res = self
            .send(path, |http, url| {
                http.put(url).query(&[("dir", true)]).timeout(timeout)
            })
            .await;
        match res {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.code(), Some(NODE_EXISTS) | Some(NOT_A_FILE)) => {
                debug!(path, "directory already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn watch(
        &self,
        path: &str,
        recursive: bool,
        after_index: Option<u64>,
    ) -> discovery_core::Result<WatchEvent> {
        let resp = self
            .send(path, |http, url| {
                let req = http
                    .get(url)
                    .query(&[("wait", true), ("recursive", recursive)]);
                match after_index {
                    Some(index) => req.query(&[("waitIndex", index)]),
                    None => req,
                }
            })
            .await?;
        match resp.into_watch_event() {
            Some(event) => Ok(event),
            None => {
                warn!(path, "watch returned without a node");
                Err(EtcdError::Protocol("watch response without node".to_string()).into())
            }
        }
    }

    async fn set(&self, path: &str, value: &str) -> discovery_core::Result<()> {
        let timeout = self.timeout;
        self.send(path, |http, url| {
            http.put(url).form(&[("value", value)]).timeout(timeout)
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_endpoints() {
        assert!(matches!(
            EtcdClient::new(&[], Duration::from_secs(1)),
            Err(EtcdError::NoEndpoints)
        ));
    }

    #[test]
    fn test_rejects_non_http_endpoints() {
        let res = EtcdClient::new(&["unix:///tmp/etcd.sock".to_string()], Duration::from_secs(1));
        assert!(matches!(res, Err(EtcdError::InvalidEndpoint(_))));
        let res = EtcdClient::new(&["not a url".to_string()], Duration::from_secs(1));
        assert!(matches!(res, Err(EtcdError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_keys_url() {
        let endpoint = Url::parse("http://localhost:4001").unwrap();
        assert_eq!(
            EtcdClient::keys_url(&endpoint, "/publication/svc1"),
            "http://localhost:4001/v2/keys/publication/svc1"
        );
        let endpoint = Url::parse("http://10.0.0.1:2379/").unwrap();
        assert_eq!(
            EtcdClient::keys_url(&endpoint, "vulcand"),
            "http://10.0.0.1:2379/v2/keys/vulcand"
        );
    }
}
