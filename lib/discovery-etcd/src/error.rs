use discovery_core::CoreError;
use thiserror::Error;

/// etcd v2 error codes the agent cares about
pub const KEY_NOT_FOUND: u64 = 100;
pub const NOT_A_FILE: u64 = 102;
pub const NODE_EXISTS: u64 = 105;

#[derive(Error, Debug)]
pub enum EtcdError {
    #[error("No etcd endpoints configured")]
    NoEndpoints,

    #[error("Invalid etcd endpoint {0}")]
    InvalidEndpoint(String),

    #[error("No etcd endpoint reachable: {0}")]
    Unreachable(String),

    #[error("etcd error {code}: {message} ({cause})")]
    Api {
        code: u64,
        message: String,
        cause: String,
    },

    #[error("Unexpected etcd response: {0}")]
    Protocol(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EtcdError {
    pub fn code(&self) -> Option<u64> {
        match self {
            EtcdError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<EtcdError> for CoreError {
    fn from(e: EtcdError) -> Self {
        match e {
            EtcdError::Api {
                code: KEY_NOT_FOUND,
                cause,
                ..
            } => CoreError::KeyNotFound(cause),
            other => CoreError::Store(other.to_string()),
        }
    }
}
