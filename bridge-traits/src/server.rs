//! Photo Server Abstractions
//!
//! Contract between the sync core and the remote photo-management service.
//! Implementations own the transport and wire format; the core only sees the
//! normalized types below.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::source::{GeoLocation, LocalAsset};

/// Album an asset belongs to on the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: String,
    pub name: String,
}

/// Asset held by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerAsset {
    /// Server-assigned identifier
    pub id: String,
    /// Identity reported by the uploading device, when known
    pub device_asset_id: Option<String>,
    pub original_file_name: String,
    pub capture_time: Option<DateTime<Utc>>,
    pub file_size: u64,
    pub is_archived: bool,
    pub is_trashed: bool,
    pub albums: Vec<AlbumRef>,
    /// Uploaded earlier in the current run. Never persisted.
    #[serde(skip)]
    pub just_uploaded: bool,
}

impl ServerAsset {
    pub fn new(id: impl Into<String>, original_file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            id: id.into(),
            device_asset_id: None,
            original_file_name: original_file_name.into(),
            capture_time: None,
            file_size,
            is_archived: false,
            is_trashed: false,
            albums: Vec::new(),
            just_uploaded: false,
        }
    }

    pub fn with_capture_time(mut self, time: DateTime<Utc>) -> Self {
        self.capture_time = Some(time);
        self
    }

    pub fn with_device_asset_id(mut self, device_asset_id: impl Into<String>) -> Self {
        self.device_asset_id = Some(device_asset_id.into());
        self
    }

    pub fn with_album(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.albums.push(AlbumRef {
            id: id.into(),
            name: name.into(),
        });
        self
    }
}

/// Album as listed by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAlbum {
    pub id: String,
    pub name: String,
    pub asset_ids: Vec<String>,
}

/// Outcome of an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Identifier of the stored asset (the existing one when `duplicate`)
    pub id: String,
    /// The server already held these exact bytes
    pub duplicate: bool,
}

/// Per-asset status of a batch album insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumAddResult {
    pub asset_id: String,
    pub success: bool,
    /// Failure reason; `"duplicate"` means the asset was already a member
    pub error: Option<String>,
}

impl AlbumAddResult {
    pub const DUPLICATE: &'static str = "duplicate";

    pub fn is_duplicate(&self) -> bool {
        !self.success && self.error.as_deref() == Some(Self::DUPLICATE)
    }
}

/// Metadata patch applied to an asset after it is on the server
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssetUpdate {
    pub favorite: bool,
    pub archived: bool,
    pub location: Option<GeoLocation>,
    pub capture_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl AssetUpdate {
    /// Build the patch carried by a local asset, `None` when it has nothing to set
    pub fn from_local(asset: &LocalAsset) -> Option<Self> {
        let description = asset
            .description
            .as_ref()
            .filter(|d| !d.is_empty())
            .cloned();

        let update = Self {
            favorite: asset.favorite,
            archived: asset.archived,
            location: asset.location,
            capture_time: asset.capture_time,
            description,
        };

        (update != Self::default()).then_some(update)
    }
}

/// Remote photo-management service
///
/// Every call is a self-contained request; the core issues them one at a
/// time and treats each failure as local to the asset or album involved.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::server::PhotoServer;
///
/// async fn count_live_assets(server: &dyn PhotoServer) -> Result<usize> {
///     let assets = server.list_assets().await?;
///     Ok(assets.iter().filter(|a| !a.is_trashed).count())
/// }
/// ```
#[async_trait]
pub trait PhotoServer: Send + Sync {
    /// List every asset of the account, trashed ones included
    async fn list_assets(&self) -> Result<Vec<ServerAsset>>;

    /// Upload the bytes and metadata of a local asset
    async fn upload(&self, asset: &LocalAsset) -> Result<UploadResponse>;

    async fn list_albums(&self) -> Result<Vec<ServerAlbum>>;

    /// Create an album seeded with the given assets
    async fn create_album(&self, name: &str, asset_ids: &[String]) -> Result<ServerAlbum>;

    /// Add assets to an existing album, reporting the outcome per asset
    async fn add_assets_to_album(
        &self,
        album_id: &str,
        asset_ids: &[String],
    ) -> Result<Vec<AlbumAddResult>>;

    /// Move assets to the trash, or delete them for good when `permanently`
    async fn delete_assets(&self, ids: &[String], permanently: bool) -> Result<()>;

    /// Group assets under a cover
    async fn stack_assets(&self, cover_id: &str, member_ids: &[String]) -> Result<()>;

    async fn update_asset(&self, id: &str, update: &AssetUpdate) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_asset_update_empty_for_bare_asset() {
        let asset = LocalAsset::new("a.jpg", 10);
        assert!(AssetUpdate::from_local(&asset).is_none());
    }

    #[test]
    fn test_asset_update_carries_metadata() {
        let mut asset = LocalAsset::new("a.jpg", 10)
            .with_capture_time(Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap());
        asset.favorite = true;
        asset.description = Some(String::new());

        let update = AssetUpdate::from_local(&asset).unwrap();
        assert!(update.favorite);
        assert!(update.capture_time.is_some());
        assert!(update.description.is_none());
    }

    #[test]
    fn test_album_add_result_duplicate() {
        let dup = AlbumAddResult {
            asset_id: "a".to_string(),
            success: false,
            error: Some("duplicate".to_string()),
        };
        let failed = AlbumAddResult {
            asset_id: "b".to_string(),
            success: false,
            error: Some("no_permission".to_string()),
        };
        assert!(dup.is_duplicate());
        assert!(!failed.is_duplicate());
    }

    #[test]
    fn test_just_uploaded_is_not_serialized() {
        let mut asset = ServerAsset::new("id-1", "photo.jpg", 100);
        asset.just_uploaded = true;
        let json = serde_json::to_string(&asset).unwrap();
        assert!(!json.contains("just_uploaded"));
        let back: ServerAsset = serde_json::from_str(&json).unwrap();
        assert!(!back.just_uploaded);
    }
}
