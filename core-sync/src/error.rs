use thiserror::Error;

use bridge_traits::BridgeError;

use crate::albums::AlbumReport;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to list server assets: {0}")]
    ServerCatalog(String),

    #[error("Upload cancelled")]
    Cancelled,

    #[error("{} album(s) could not be reconciled: {}", failures.len(), failures.join("; "))]
    AlbumReconciliation {
        failures: Vec<String>,
        /// Counters of the albums that did go through
        report: AlbumReport,
    },

    #[error("Failed to delete server assets: {0}")]
    ServerDelete(String),

    #[error("Failed to delete local files: {0}")]
    LocalDelete(String),

    #[error("Asset source error: {0}")]
    Source(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Config(#[from] core_runtime::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
