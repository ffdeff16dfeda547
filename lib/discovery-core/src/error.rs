use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Coordination store error: {0}")]
    Store(String),

    #[error("Container runtime error: {0}")]
    Runtime(String),

    #[error("Invalid service definition {key}: {reason}")]
    InvalidDefinition { key: String, reason: String },

    #[error("Watch on {path} abandoned, last error: {last_error}")]
    WatchExhausted { path: String, last_error: String },

    #[error("Watch task exited unexpectedly")]
    WatchAborted,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn invalid_definition(key: &str, reason: impl ToString) -> Self {
        CoreError::InvalidDefinition {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
