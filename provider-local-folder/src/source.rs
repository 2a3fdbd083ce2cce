//! Local folder asset source
//!
//! Walks the configured roots on a blocking thread and streams every media
//! file it finds as a [`LocalAsset`]. File names are relative to their root
//! and `/` separated, so the parent directory name can serve as an album.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::source::{AssetSource, LocalAsset, SourceItem, SourceKind};
use chrono::{DateTime, Utc};
use std::path::{Component, Path};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::FolderSourceConfig;
use crate::error::{LocalFolderError, Result};
use crate::filename_date::date_from_name;

/// [`AssetSource`] over one or more plain directory trees
#[derive(Debug, Clone)]
pub struct LocalFolderSource {
    config: FolderSourceConfig,
}

impl LocalFolderSource {
    /// # Errors
    ///
    /// Fails with [`LocalFolderError::NotADirectory`] when a root is missing
    /// or is a file.
    pub fn new(config: FolderSourceConfig) -> Result<Self> {
        if let Some(root) = config.roots.iter().find(|root| !root.is_dir()) {
            return Err(LocalFolderError::NotADirectory(root.display().to_string()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &FolderSourceConfig {
        &self.config
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// `root/2023/Summer/a.jpg` relative to `root` becomes `2023/Summer/a.jpg`
fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn describe(root: &Path, entry: &DirEntry) -> std::result::Result<LocalAsset, String> {
    let metadata = entry.metadata().map_err(|e| e.to_string())?;
    let file_name = relative_name(root, entry.path());

    let capture_time = date_from_name(&entry.file_name().to_string_lossy()).or_else(|| {
        metadata.modified().ok().map(DateTime::<Utc>::from)
    });

    let mut asset = LocalAsset::new(file_name, metadata.len()).with_origin(entry.path());
    asset.capture_time = capture_time;
    Ok(asset)
}

/// Walk every root, returning `false` when the consumer went away or the
/// run was cancelled
fn walk(
    config: &FolderSourceConfig,
    tx: &UnboundedSender<SourceItem>,
    cancel: &CancellationToken,
) -> bool {
    for root in &config.roots {
        let walker = WalkDir::new(root)
            .follow_links(config.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        for entry in walker {
            if cancel.is_cancelled() {
                debug!("Folder walk cancelled");
                return false;
            }

            let item = match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let accepted = entry
                        .path()
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| config.accepts_extension(ext))
                        .unwrap_or(false);
                    if !accepted {
                        continue;
                    }
                    match describe(root, &entry) {
                        Ok(asset) => SourceItem::Asset(asset),
                        Err(message) => SourceItem::Failed {
                            file_name: relative_name(root, entry.path()),
                            error: message,
                        },
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| relative_name(root, p))
                        .unwrap_or_else(|| root.display().to_string());
                    warn!(path = %path, error = %e, "Failed to read directory entry");
                    SourceItem::Failed {
                        file_name: path,
                        error: e.to_string(),
                    }
                }
            };

            if tx.send(item).is_err() {
                debug!("Asset receiver dropped, stopping folder walk");
                return false;
            }
        }
    }
    true
}

#[async_trait]
impl AssetSource for LocalFolderSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Folder
    }

    #[instrument(skip(self, cancel), fields(roots = self.config.roots.len()))]
    async fn browse(
        &self,
        cancel: CancellationToken,
    ) -> BridgeResult<UnboundedReceiver<SourceItem>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = self.config.clone();

        let handle = tokio::task::spawn_blocking(move || {
            if walk(&config, &tx, &cancel) {
                info!("Folder walk complete");
            }
        });

        tokio::spawn(async move {
            if let Err(e) = handle.await {
                error!(error = %e, "Folder walker task failed");
            }
        });

        Ok(rx)
    }

    async fn remove(&self, asset: &LocalAsset) -> BridgeResult<()> {
        tokio::fs::remove_file(&asset.origin)
            .await
            .map_err(LocalFolderError::from)?;
        debug!(file = %asset.file_name, "Removed local file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, bytes: usize) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![0u8; bytes]).unwrap();
    }

    async fn collect(source: &LocalFolderSource) -> Vec<SourceItem> {
        let mut rx = source.browse(CancellationToken::new()).await.unwrap();
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    fn assets(items: Vec<SourceItem>) -> Vec<LocalAsset> {
        items
            .into_iter()
            .filter_map(|item| match item {
                SourceItem::Asset(asset) => Some(asset),
                SourceItem::Failed { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_missing_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = FolderSourceConfig::builder()
            .root(dir.path().join("missing"))
            .build()
            .unwrap();
        assert!(matches!(
            LocalFolderSource::new(config),
            Err(LocalFolderError::NotADirectory(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_browse_lists_media_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2023/Summer/IMG_20230714_093000.jpg", 10);
        write(dir.path(), "2023/Summer/IMG_20230714_093000.CR2", 20);
        write(dir.path(), "2023/Summer/notes.txt", 5);
        write(dir.path(), ".thumbnails/a.jpg", 5);
        write(dir.path(), "2023/.hidden.jpg", 5);
        write(dir.path(), "clip.mp4", 30);

        let config = FolderSourceConfig::builder().root(dir.path()).build().unwrap();
        let source = LocalFolderSource::new(config).unwrap();
        assert_eq!(source.kind(), SourceKind::Folder);

        let found = assets(collect(&source).await);
        let names: Vec<_> = found.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "2023/Summer/IMG_20230714_093000.CR2",
                "2023/Summer/IMG_20230714_093000.jpg",
                "clip.mp4",
            ]
        );

        let jpg = &found[1];
        assert_eq!(jpg.size, 10);
        assert_eq!(jpg.parent_folder(), Some("Summer"));
        assert_eq!(jpg.origin, dir.path().join("2023/Summer/IMG_20230714_093000.jpg"));
        assert_eq!(jpg.capture_time, date_from_name("IMG_20230714_093000.jpg"));

        // no date in the name, falls back to the modification time
        assert!(found[2].capture_time.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_browse_honours_extension_selection() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.jpg", 1);
        write(dir.path(), "b.mp4", 1);

        let config = FolderSourceConfig::builder()
            .root(dir.path())
            .exclude_extensions(["mp4"])
            .build()
            .unwrap();
        let source = LocalFolderSource::new(config).unwrap();

        let found = assets(collect(&source).await);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name, "a.jpg");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancelled_browse_closes_channel() {
        let dir = TempDir::new().unwrap();
        for i in 0..20 {
            write(dir.path(), &format!("img_{i:02}.jpg"), 1);
        }
        let config = FolderSourceConfig::builder().root(dir.path()).build().unwrap();
        let source = LocalFolderSource::new(config).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut rx = source.browse(cancel).await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_deletes_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.jpg", 1);
        let config = FolderSourceConfig::builder().root(dir.path()).build().unwrap();
        let source = LocalFolderSource::new(config).unwrap();

        let found = assets(collect(&source).await);
        source.remove(&found[0]).await.unwrap();
        assert!(!dir.path().join("a.jpg").exists());
        assert!(source.remove(&found[0]).await.is_err());
    }
}
