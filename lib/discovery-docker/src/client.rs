//! Container listing over the Docker Engine API

use crate::wire::ApiContainer;
use crate::{DockerEndpoint, DockerError};
use async_trait::async_trait;
use discovery_api::ContainerInstance;
use discovery_core::ContainerRuntime;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::client::conn::http1;
use hyper::{header, Request};
use hyper_util::rt::tokio::TokioIo;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};
use tracing::debug;

/// Docker client. Opens one connection per request.
pub struct DockerClient {
    endpoint: DockerEndpoint,
    timeout: Duration,
}

impl DockerClient {
    pub fn new(host: &str, timeout: Duration) -> Result<Self, DockerError> {
        Ok(Self {
            endpoint: DockerEndpoint::parse(host)?,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &DockerEndpoint {
        &self.endpoint
    }

    /// Issue a GET and return the body of a successful response
    pub async fn get(&self, path: &str) -> Result<Bytes, DockerError> {
        let request = async {
            match &self.endpoint {
                DockerEndpoint::Unix(socket) => {
                    let stream = UnixStream::connect(socket)
                        .await
                        .map_err(|source| self.connect_error(source))?;
                    self.send(stream, path).await
                }
                DockerEndpoint::Tcp(authority) => {
                    let stream = TcpStream::connect(authority.as_str())
                        .await
                        .map_err(|source| self.connect_error(source))?;
                    self.send(stream, path).await
                }
            }
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| DockerError::Timeout(self.timeout))?
    }

    fn connect_error(&self, source: std::io::Error) -> DockerError {
        DockerError::Connect {
            endpoint: self.endpoint.to_string(),
            source,
        }
    }

    async fn send<S>(&self, stream: S, path: &str) -> Result<Bytes, DockerError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("Docker connection error: {}", e);
            }
        });

        let req = Request::get(path)
            .header(header::HOST, self.endpoint.host_header())
            .body(Empty::<Bytes>::new())?;
        let resp = sender.send_request(req).await?;

        let status = resp.status();
        let body = resp.into_body().collect().await?.to_bytes();
        if !status.is_success() {
            return Err(DockerError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list_containers(&self) -> discovery_core::Result<Vec<ContainerInstance>> {
        let body = self.get("/containers/json").await?;
        let containers: Vec<ApiContainer> =
            serde_json::from_slice(&body).map_err(DockerError::from)?;
        debug!(count = containers.len(), "listed docker containers");
        Ok(containers.into_iter().map(ContainerInstance::from).collect())
    }
}
