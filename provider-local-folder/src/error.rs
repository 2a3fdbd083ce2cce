//! Error types for the local folder provider

use thiserror::Error;

/// Local folder provider errors
#[derive(Error, Debug)]
pub enum LocalFolderError {
    /// A configured root does not exist or is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for local folder operations
pub type Result<T> = std::result::Result<T, LocalFolderError>;

impl From<LocalFolderError> for bridge_traits::error::BridgeError {
    fn from(error: LocalFolderError) -> Self {
        match error {
            LocalFolderError::Io(e) => bridge_traits::error::BridgeError::Io(e),
            other => bridge_traits::error::BridgeError::OperationFailed(other.to_string()),
        }
    }
}
