//! # Local Folder Provider
//!
//! Implements the `AssetSource` trait over plain directory trees.
//!
//! ## Overview
//!
//! This module provides:
//! - Recursive walking of one or more root folders on a blocking thread
//! - Media filtering by extension, with select or exclude lists
//! - Capture times read from file names, falling back to modification time
//! - Removal of local originals once they are safely on the server

pub mod config;
pub mod error;
pub mod filename_date;
pub mod source;

pub use config::{FolderSourceConfig, FolderSourceConfigBuilder};
pub use error::{LocalFolderError, Result};
pub use filename_date::date_from_name;
pub use source::LocalFolderSource;
