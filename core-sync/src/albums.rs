//! Album Reconciliation
//!
//! Turns the album membership wanted at the end of a run into the smallest set
//! of server calls.
//!
//! ## Overview
//!
//! During the run, every asset that should land in an album is recorded with
//! [`AlbumReconciler::add_desired`]. At the end:
//!
//! 1. [`AlbumReconciler::plan`] compares the wanted albums with the server's
//!    album list: an album that already exists (exact name match) only gets
//!    the assets added, a missing one is created with them
//! 2. [`AlbumReconciler::reconcile`] executes the plan. A failure on one album
//!    does not stop the others; all failures are reported together.
//!
//! The server answers `duplicate` for assets that are already members; those
//! are counted, not treated as failures.

use crate::error::{Result, SyncError};
use bridge_traits::{PhotoServer, ServerAlbum};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// One server call needed to reach the wanted membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumOperation {
    AddAssets {
        album_id: String,
        name: String,
        asset_ids: Vec<String>,
    },
    Create {
        name: String,
        asset_ids: Vec<String>,
    },
}

impl AlbumOperation {
    pub fn name(&self) -> &str {
        match self {
            Self::AddAssets { name, .. } | Self::Create { name, .. } => name,
        }
    }

    pub fn asset_ids(&self) -> &[String] {
        match self {
            Self::AddAssets { asset_ids, .. } | Self::Create { asset_ids, .. } => asset_ids,
        }
    }
}

/// Counters of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlbumReport {
    pub albums_created: usize,
    pub albums_updated: usize,
    pub assets_added: usize,
    /// Assets the server reported as already in the album
    pub already_present: usize,
    /// Per-asset failures other than duplicates
    pub asset_failures: usize,
}

/// Wanted album membership, album name to asset IDs
#[derive(Debug, Default, Clone)]
pub struct AlbumReconciler {
    desired: BTreeMap<String, BTreeSet<String>>,
}

impl AlbumReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `asset_id` belongs in album `name`
    pub fn add_desired(&mut self, name: impl Into<String>, asset_id: impl Into<String>) {
        self.desired
            .entry(name.into())
            .or_default()
            .insert(asset_id.into());
    }

    pub fn desired(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.desired
    }

    pub fn is_empty(&self) -> bool {
        self.desired.values().all(BTreeSet::is_empty)
    }

    /// Operations needed given the albums already on the server
    pub fn plan(&self, existing: &[ServerAlbum]) -> Vec<AlbumOperation> {
        self.desired
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(name, ids)| {
                let asset_ids: Vec<String> = ids.iter().cloned().collect();
                match existing.iter().find(|album| &album.name == name) {
                    Some(album) => AlbumOperation::AddAssets {
                        album_id: album.id.clone(),
                        name: name.clone(),
                        asset_ids,
                    },
                    None => AlbumOperation::Create {
                        name: name.clone(),
                        asset_ids,
                    },
                }
            })
            .collect()
    }

    /// Execute the plan against the server
    ///
    /// In dry-run mode the plan is only logged and counted.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlbumReconciliation`] listing every album whose
    /// call failed, after all albums were attempted. The error carries the
    /// counters of the albums that went through.
    #[instrument(skip_all, fields(albums = self.desired.len(), dry_run = dry_run))]
    pub async fn reconcile(
        self,
        existing: &[ServerAlbum],
        server: &dyn PhotoServer,
        dry_run: bool,
    ) -> Result<AlbumReport> {
        let mut report = AlbumReport::default();
        let mut failures = Vec::new();

        for operation in self.plan(existing) {
            match operation {
                AlbumOperation::AddAssets {
                    album_id,
                    name,
                    asset_ids,
                } => {
                    if dry_run {
                        info!("Would add {} asset(s) to album '{}'", asset_ids.len(), name);
                        report.albums_updated += 1;
                        report.assets_added += asset_ids.len();
                        continue;
                    }

                    match server.add_assets_to_album(&album_id, &asset_ids).await {
                        Ok(results) => {
                            report.albums_updated += 1;
                            for result in results {
                                if result.success {
                                    report.assets_added += 1;
                                } else if result.is_duplicate() {
                                    report.already_present += 1;
                                } else {
                                    report.asset_failures += 1;
                                    warn!(
                                        album = %name,
                                        asset_id = %result.asset_id,
                                        "Failed to add asset to album: {}",
                                        result.error.as_deref().unwrap_or("unknown error")
                                    );
                                }
                            }
                            debug!("Album '{}' updated", name);
                        }
                        Err(e) => {
                            warn!("Failed to add assets to album '{}': {}", name, e);
                            failures.push(format!("{}: {}", name, e));
                        }
                    }
                }
                AlbumOperation::Create { name, asset_ids } => {
                    if dry_run {
                        info!("Would create album '{}' with {} asset(s)", name, asset_ids.len());
                        report.albums_created += 1;
                        report.assets_added += asset_ids.len();
                        continue;
                    }

                    match server.create_album(&name, &asset_ids).await {
                        Ok(album) => {
                            info!(album_id = %album.id, "Created album '{}'", name);
                            report.albums_created += 1;
                            report.assets_added += asset_ids.len();
                        }
                        Err(e) => {
                            warn!("Failed to create album '{}': {}", name, e);
                            failures.push(format!("{}: {}", name, e));
                        }
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(SyncError::AlbumReconciliation { failures, report })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        AlbumAddResult, AssetUpdate, BridgeError, LocalAsset, ServerAsset, UploadResponse,
    };
    use mockall::{mock, predicate::*};

    mock! {
        Server {}

        #[async_trait]
        impl PhotoServer for Server {
            async fn list_assets(&self) -> BridgeResult<Vec<ServerAsset>>;
            async fn upload(&self, asset: &LocalAsset) -> BridgeResult<UploadResponse>;
            async fn list_albums(&self) -> BridgeResult<Vec<ServerAlbum>>;
            async fn create_album(&self, name: &str, asset_ids: &[String]) -> BridgeResult<ServerAlbum>;
            async fn add_assets_to_album(
                &self,
                album_id: &str,
                asset_ids: &[String],
            ) -> BridgeResult<Vec<AlbumAddResult>>;
            async fn delete_assets(&self, ids: &[String], permanently: bool) -> BridgeResult<()>;
            async fn stack_assets(&self, cover_id: &str, member_ids: &[String]) -> BridgeResult<()>;
            async fn update_asset(&self, id: &str, update: &AssetUpdate) -> BridgeResult<()>;
        }
    }

    fn album(id: &str, name: &str) -> ServerAlbum {
        ServerAlbum {
            id: id.to_string(),
            name: name.to_string(),
            asset_ids: Vec::new(),
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_add_desired_is_idempotent() {
        let mut reconciler = AlbumReconciler::new();
        reconciler.add_desired("Trip", "a");
        reconciler.add_desired("Trip", "a");
        reconciler.add_desired("Trip", "b");

        assert_eq!(reconciler.desired()["Trip"].len(), 2);
    }

    #[test]
    fn test_plan_adds_to_existing_and_creates_missing() {
        let mut reconciler = AlbumReconciler::new();
        reconciler.add_desired("Trip", "b");
        reconciler.add_desired("Trip", "a");
        reconciler.add_desired("New", "c");

        let plan = reconciler.plan(&[album("alb-1", "Trip"), album("alb-2", "Trip")]);
        assert_eq!(
            plan,
            vec![
                AlbumOperation::Create {
                    name: "New".to_string(),
                    asset_ids: ids(&["c"]),
                },
                AlbumOperation::AddAssets {
                    album_id: "alb-1".to_string(),
                    name: "Trip".to_string(),
                    asset_ids: ids(&["a", "b"]),
                },
            ]
        );
    }

    #[test]
    fn test_plan_name_match_is_case_sensitive() {
        let mut reconciler = AlbumReconciler::new();
        reconciler.add_desired("trip", "a");

        let plan = reconciler.plan(&[album("alb-1", "Trip")]);
        assert!(matches!(plan[0], AlbumOperation::Create { .. }));
    }

    #[test]
    fn test_plan_skips_empty_sets() {
        let mut reconciler = AlbumReconciler::new();
        reconciler.desired.insert("Empty".to_string(), BTreeSet::new());

        assert!(reconciler.is_empty());
        assert!(reconciler.plan(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_counts_duplicates() {
        let mut server = MockServer::new();
        server
            .expect_add_assets_to_album()
            .with(eq("alb-1"), always())
            .times(1)
            .returning(|_, ids| {
                Ok(ids
                    .iter()
                    .map(|id| AlbumAddResult {
                        asset_id: id.clone(),
                        success: id != "a",
                        error: (id == "a").then(|| AlbumAddResult::DUPLICATE.to_string()),
                    })
                    .collect())
            });
        server.expect_create_album().never();

        let mut reconciler = AlbumReconciler::new();
        reconciler.add_desired("Trip", "a");
        reconciler.add_desired("Trip", "b");

        let report = reconciler
            .reconcile(&[album("alb-1", "Trip")], &server, false)
            .await
            .unwrap();
        assert_eq!(report.albums_updated, 1);
        assert_eq!(report.assets_added, 1);
        assert_eq!(report.already_present, 1);
        assert_eq!(report.asset_failures, 0);
    }

    #[tokio::test]
    async fn test_reconcile_continues_after_album_failure() {
        let mut server = MockServer::new();
        server
            .expect_create_album()
            .with(eq("Broken"), always())
            .times(1)
            .returning(|_, _| Err(BridgeError::Server {
                status: 500,
                message: "boom".to_string(),
            }));
        server
            .expect_create_album()
            .with(eq("Fine"), always())
            .times(1)
            .returning(|name, ids| {
                Ok(ServerAlbum {
                    id: "alb-9".to_string(),
                    name: name.to_string(),
                    asset_ids: ids.to_vec(),
                })
            });

        let mut reconciler = AlbumReconciler::new();
        reconciler.add_desired("Broken", "a");
        reconciler.add_desired("Fine", "b");

        let err = reconciler.reconcile(&[], &server, false).await.unwrap_err();
        match err {
            SyncError::AlbumReconciliation { failures, report } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].starts_with("Broken"));
                assert_eq!(report.albums_created, 1);
                assert_eq!(report.assets_added, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_reconcile_dry_run_makes_no_calls() {
        let mut server = MockServer::new();
        server.expect_create_album().never();
        server.expect_add_assets_to_album().never();

        let mut reconciler = AlbumReconciler::new();
        reconciler.add_desired("Trip", "a");
        reconciler.add_desired("New", "b");

        let report = reconciler
            .reconcile(&[album("alb-1", "Trip")], &server, true)
            .await
            .unwrap();
        assert_eq!(report.albums_created, 1);
        assert_eq!(report.albums_updated, 1);
    }
}
