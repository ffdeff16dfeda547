//! Docker host addresses

use crate::DockerError;
use std::fmt;
use std::path::PathBuf;

/// Where the docker daemon listens
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DockerEndpoint {
    /// Unix domain socket, `unix:///var/run/docker.sock`
    Unix(PathBuf),
    /// Plain TCP, `tcp://host:2375` or `http://host:2375`
    Tcp(String),
}

impl DockerEndpoint {
    pub fn parse(host: &str) -> Result<Self, DockerError> {
        let host = host.trim();
        if let Some(path) = host.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(DockerError::UnsupportedHost(host.to_string()));
            }
            return Ok(DockerEndpoint::Unix(PathBuf::from(path)));
        }
        if host.starts_with('/') {
            return Ok(DockerEndpoint::Unix(PathBuf::from(host)));
        }

        let authority = host
            .strip_prefix("tcp://")
            .or_else(|| host.strip_prefix("http://"))
            .map(|rest| rest.trim_end_matches('/'))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .ok_or_else(|| DockerError::UnsupportedHost(host.to_string()))?;

        Ok(DockerEndpoint::Tcp(authority.to_string()))
    }

    /// Value for the Host header
    pub fn host_header(&self) -> &str {
        match self {
            DockerEndpoint::Unix(_) => "docker",
            DockerEndpoint::Tcp(authority) => authority,
        }
    }
}

impl fmt::Display for DockerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerEndpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            DockerEndpoint::Tcp(authority) => write!(f, "tcp://{}", authority),
        }
    }
}
