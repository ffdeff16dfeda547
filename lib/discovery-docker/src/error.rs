use discovery_core::CoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockerError {
    #[error("Unsupported docker host {0}")]
    UnsupportedHost(String),

    #[error("Could not connect to docker at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    #[error("Docker request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Docker returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("Unexpected docker response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<DockerError> for CoreError {
    fn from(e: DockerError) -> Self {
        CoreError::Runtime(e.to_string())
    }
}
