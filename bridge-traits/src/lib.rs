//! # Bridge Traits
//!
//! Contracts between the sync core and its external collaborators.
//!
//! ## Overview
//!
//! The core decides what to upload, skip, replace, stack and file into albums.
//! Everything that touches the outside world is behind a trait defined here and
//! implemented elsewhere:
//!
//! - [`PhotoServer`](server::PhotoServer) - remote photo-management service
//!   (asset catalogue, uploads, albums, stacks, deletions, metadata patches)
//! - [`AssetSource`](source::AssetSource) - producer of local assets (folder
//!   walker, export archive reader)
//! - [`Clock`](time::Clock) - time source for deterministic testing
//!
//! ## Data Model
//!
//! [`LocalAsset`](source::LocalAsset) is the normalized descriptor every source
//! emits; [`ServerAsset`](server::ServerAsset) is what the server reports back.
//! Transports translate their wire formats into these types.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert transport or filesystem errors into it and keep the message
//! actionable (file name, HTTP status).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared with
//! the producer task.

pub mod error;
pub mod server;
pub mod source;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use server::{
    AlbumAddResult, AlbumRef, AssetUpdate, PhotoServer, ServerAlbum, ServerAsset, UploadResponse,
};
pub use source::{AssetSource, GeoLocation, LocalAlbum, LocalAsset, SourceItem, SourceKind};
pub use time::{Clock, LogLevel, SystemClock};
