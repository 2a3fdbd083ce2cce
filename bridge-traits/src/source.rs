//! Local Asset Source Abstractions
//!
//! Describes the media files discovered on the local side (plain folders or an
//! export archive) and the producer trait that streams them to the core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Kind of collection an [`AssetSource`] reads from.
///
/// Album naming rules differ between the two: archives carry album titles in
/// their metadata, folders only have directory names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Plain directory tree
    Folder,
    /// Structured export archive (album metadata available)
    Archive,
}

/// Album membership declared by the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAlbum {
    /// Album title as found in the source metadata (may be empty)
    pub name: String,
    /// Path of the album inside the source
    pub path: String,
}

impl LocalAlbum {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Album whose name doubles as its path (folder and import albums)
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
        }
    }
}

/// GPS position attached to an asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Normalized description of a media file found on the local side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalAsset {
    /// Path inside the source, `/` separated
    pub file_name: String,
    /// Location the uploader reads the bytes from
    pub origin: PathBuf,
    /// Display title (archive metadata title, or the file name)
    pub title: String,
    /// Capture time, `None` when unknown
    pub capture_time: Option<DateTime<Utc>>,
    /// Size in bytes
    pub size: u64,
    pub location: Option<GeoLocation>,
    pub description: Option<String>,
    /// Asset belongs to a linked partner account
    pub from_partner: bool,
    pub archived: bool,
    pub trashed: bool,
    pub favorite: bool,
    pub albums: Vec<LocalAlbum>,
}

impl LocalAsset {
    /// Create an asset with only the identity fields set
    pub fn new(file_name: impl Into<String>, size: u64) -> Self {
        let file_name = file_name.into();
        Self {
            origin: PathBuf::from(&file_name),
            title: base_name(&file_name).to_string(),
            file_name,
            capture_time: None,
            size,
            location: None,
            description: None,
            from_partner: false,
            archived: false,
            trashed: false,
            favorite: false,
            albums: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_capture_time(mut self, time: DateTime<Utc>) -> Self {
        self.capture_time = Some(time);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_album(mut self, album: LocalAlbum) -> Self {
        self.add_album(album);
        self
    }

    /// Stable identity of the asset on the device: `<title basename>-<size>`
    pub fn device_asset_id(&self) -> String {
        format!("{}-{}", base_name(&self.title), self.size)
    }

    /// Title completed with the file extension when the title has none
    pub fn effective_file_name(&self) -> String {
        let title = base_name(&self.title);
        if extension(title).is_some() {
            return title.to_string();
        }
        match extension(&self.file_name) {
            Some(ext) => format!("{}.{}", title, ext),
            None => title.to_string(),
        }
    }

    /// Add an album membership unless one with the same name exists
    pub fn add_album(&mut self, album: LocalAlbum) {
        if !self.albums.iter().any(|a| a.name == album.name) {
            self.albums.push(album);
        }
    }

    /// Name of the folder holding the file, `None` at the source root
    pub fn parent_folder(&self) -> Option<&str> {
        let (dir, _) = self.file_name.rsplit_once('/')?;
        let name = base_name(dir);
        (!name.is_empty() && name != ".").then_some(name)
    }
}

/// Last component of a `/` or `\` separated path
pub fn base_name(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}

/// Extension of the last path component, without the dot
pub fn extension(path: &str) -> Option<&str> {
    let name = base_name(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Item delivered by an [`AssetSource`]
#[derive(Debug, Clone)]
pub enum SourceItem {
    Asset(LocalAsset),
    /// The source could not read or describe a file
    Failed { file_name: String, error: String },
}

/// Producer of local assets
///
/// `browse` starts a producer task and returns the consuming end of an
/// unbounded, ordered channel. The producer must stop promptly once the
/// token is cancelled and close the channel when the collection is exhausted.
#[async_trait]
pub trait AssetSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn browse(&self, cancel: CancellationToken) -> Result<UnboundedReceiver<SourceItem>>;

    /// Delete the original of an asset after it landed on the server
    async fn remove(&self, asset: &LocalAsset) -> Result<()>;
}
