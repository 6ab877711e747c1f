use thiserror::Error;

use crate::auth::ValidationError;

/// Failure of a storage backend call.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encryption error: {0}")]
    Crypto(String),
}

/// Failure of a Session Manager operation.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to save session: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// User-facing alert text. Storage details stay in the logs.
    pub fn alert_message(&self) -> String {
        match self {
            AuthError::Validation(e) => e.to_string(),
            AuthError::Storage(_) => "Something went wrong while saving your session".to_string(),
        }
    }
}
