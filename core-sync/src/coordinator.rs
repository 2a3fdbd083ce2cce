//! # Upload Coordinator
//!
//! Drives one upload run from the server catalogue to the final report.
//!
//! ## Overview
//!
//! The coordinator owns the run-scoped state ([`RunContext`]) and talks to
//! the outside world only through [`PhotoServer`] and [`AssetSource`]:
//!
//! 1. **Prepare**: fetch the server catalogue and build the [`AssetIndex`].
//!    Failure here is fatal; nothing has been touched yet.
//! 2. **Intake**: pull assets from the source one at a time, filter them,
//!    ask for advice, plan and execute the actions.
//! 3. **Finalize**, in this order: stacks, albums, server deletions, local
//!    deletions, report.
//!
//! ## Cancellation
//!
//! Cancelling the token stops intake at the next asset. The token is also
//! checked before every server call, so no request is issued once
//! cancellation has been observed. A cancelled run skips finalization and
//! returns [`SyncError::Cancelled`].
//!
//! ## Dry Run
//!
//! With `dry_run` set, uploads get a random identifier and every mutating
//! call (upload, album, stack, delete, metadata) is logged instead of issued.
//! The advice still sees the would-be uploads, so same-run duplicates are
//! detected exactly as in a real run.
//!
//! ## Usage
//!
//! ```no_run
//! use bridge_traits::{AssetSource, PhotoServer};
//! use core_runtime::config::UploadConfig;
//! use core_sync::coordinator::UploadCoordinator;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(
//! #     server: Arc<dyn PhotoServer>,
//! #     source: Arc<dyn AssetSource>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = UploadConfig::builder().delete_local(true).build()?;
//! let mut coordinator = UploadCoordinator::new(server, config);
//!
//! coordinator.prepare().await?;
//! let report = coordinator.run(source.as_ref(), CancellationToken::new()).await?;
//! println!("{} assets uploaded", report.uploaded);
//! # Ok(())
//! # }
//! ```

use crate::advice::evaluate;
use crate::asset_index::AssetIndex;
use crate::albums::AlbumReport;
use crate::context::RunContext;
use crate::dispatch::{plan_asset, Action, AssetPlan};
use crate::error::{Result, SyncError};
use crate::journal::{JournalAction, RunReport};
use crate::selection::{check, strip_untitled_albums, Selection};
use crate::stacking::{Stack, StackType};
use bridge_traits::{
    AssetSource, Clock, LocalAlbum, LocalAsset, PhotoServer, SourceItem, SourceKind, SystemClock,
    UploadResponse,
};
use core_runtime::config::UploadConfig;
use core_runtime::logging::strip_path;
use std::mem;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub struct UploadCoordinator {
    server: Arc<dyn PhotoServer>,
    config: UploadConfig,
    clock: Arc<dyn Clock>,
    context: RunContext,
    prepared: bool,
}

impl UploadCoordinator {
    pub fn new(server: Arc<dyn PhotoServer>, config: UploadConfig) -> Self {
        let stacking = config.create_stacks;
        Self {
            server,
            config,
            clock: Arc::new(SystemClock),
            context: RunContext::new(AssetIndex::default(), stacking),
            prepared: false,
        }
    }

    /// Use a custom time source for the run report
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Fetch the server catalogue and build the index
    ///
    /// Returns the number of indexed assets.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ServerCatalog`] when the server cannot list its
    /// assets.
    #[instrument(skip(self))]
    pub async fn prepare(&mut self) -> Result<usize> {
        info!("Phase 1: Listing server assets");
        let assets = self
            .server
            .list_assets()
            .await
            .map_err(|e| SyncError::ServerCatalog(e.to_string()))?;

        let listed = assets.len();
        let index = AssetIndex::new(assets);
        info!(
            "Indexed {} server assets ({} trashed skipped)",
            index.len(),
            listed - index.len()
        );

        self.context = RunContext::new(index, self.config.create_stacks);
        self.prepared = true;
        Ok(self.context.index.len())
    }

    /// Process every asset of `source`, then finalize the run
    ///
    /// Calls [`prepare`](Self::prepare) first when it has not run yet.
    #[instrument(skip(self, source, cancel), fields(dry_run = self.config.dry_run))]
    pub async fn run(
        &mut self,
        source: &dyn AssetSource,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let started_at = self.clock.now();
        if !self.prepared {
            self.prepare().await?;
        }

        info!("Phase 2: Processing local assets");
        let kind = source.kind();
        let mut items = source
            .browse(cancel.clone())
            .await
            .map_err(|e| SyncError::Source(e.to_string()))?;

        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Upload cancelled after {} asset(s)", self.context.scanned);
                    return Err(SyncError::Cancelled);
                }
                item = items.recv() => item,
            };

            match item {
                Some(SourceItem::Asset(asset)) => self.handle_asset(asset, kind, &cancel).await?,
                Some(SourceItem::Failed { file_name, error }) => {
                    self.context.scanned += 1;
                    self.context.journal.record(JournalAction::Error, file_name, error);
                }
                None => break,
            }
        }

        info!(
            "Processed {} asset(s), {} uploaded",
            self.context.scanned, self.context.uploaded
        );

        self.finalize(source, &cancel, started_at).await
    }

    async fn handle_asset(
        &mut self,
        mut asset: LocalAsset,
        kind: SourceKind,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.context.scanned += 1;
        strip_untitled_albums(&mut asset, &self.config);

        if let Selection::Rejected(reason) = check(&asset, &self.config, kind) {
            self.context
                .journal
                .record(JournalAction::NotSelected, &asset.file_name, reason);
            return Ok(());
        }

        let advice = evaluate(&self.context.index, &asset);
        debug!(
            file = %strip_path(&asset.file_name),
            verdict = %advice.verdict,
            "{}",
            advice.message
        );

        let plan = plan_asset(&advice, &asset, &self.config, kind);
        self.execute(plan, asset, cancel).await
    }

    /// Carry out a plan in order
    async fn execute(
        &mut self,
        plan: AssetPlan,
        mut asset: LocalAsset,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut target = plan.target;

        for action in plan.actions {
            match action {
                Action::Journal(journal_action, message) => {
                    self.context
                        .journal
                        .record(journal_action, &asset.file_name, message);
                }
                Action::MergeServerAlbums(names) => {
                    for name in names {
                        asset.add_album(LocalAlbum::named(name));
                    }
                }
                Action::Upload { on_failure } => match self.upload(&asset, cancel).await? {
                    Some(id) => target = Some(id),
                    None => {
                        for fallback in on_failure {
                            self.apply_fallback(fallback, &asset);
                        }
                        return Ok(());
                    }
                },
                Action::JoinAlbum(name) => match target.as_ref() {
                    Some(id) => self.context.albums.add_desired(name, id.clone()),
                    None => debug!("No server asset to add to album '{}'", name),
                },
                Action::QueueLocalDelete => self.context.queue_local_delete(&asset),
                Action::QueueServerDelete(id) => self.context.queue_server_delete(id),
                Action::UpdateMetadata(update) => {
                    let Some(id) = target.as_ref() else {
                        continue;
                    };
                    if self.config.dry_run {
                        debug!(asset_id = %id, "Metadata update skipped, dry run");
                        continue;
                    }
                    ensure_active(cancel)?;
                    if let Err(e) = self.server.update_asset(id, &update).await {
                        self.context.journal.record(
                            JournalAction::ServerError,
                            &asset.file_name,
                            format!("can't update the asset '{}': {}", id, e),
                        );
                    }
                }
                Action::Stop => return Ok(()),
            }
        }

        Ok(())
    }

    /// Actions that run after a failed upload; only bookkeeping is allowed
    fn apply_fallback(&mut self, action: Action, asset: &LocalAsset) {
        match action {
            Action::QueueServerDelete(id) => self.context.queue_server_delete(id),
            Action::QueueLocalDelete => self.context.queue_local_delete(asset),
            Action::Journal(journal_action, message) => {
                self.context
                    .journal
                    .record(journal_action, &asset.file_name, message);
            }
            other => warn!("Ignoring {:?} after a failed upload", other),
        }
    }

    /// Upload one asset, returning the server ID or `None` when it failed
    async fn upload(
        &mut self,
        asset: &LocalAsset,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let response = if self.config.dry_run {
            UploadResponse {
                id: Uuid::new_v4().to_string(),
                duplicate: false,
            }
        } else {
            ensure_active(cancel)?;
            match self.server.upload(asset).await {
                Ok(response) => response,
                Err(e) => {
                    self.context
                        .journal
                        .record(JournalAction::ServerError, &asset.file_name, e.to_string());
                    return Ok(None);
                }
            }
        };

        if response.duplicate {
            self.context.journal.record(
                JournalAction::ServerDuplicate,
                &asset.file_name,
                "already on the server",
            );
        } else {
            self.context.register_uploaded(asset, &response.id);
        }

        Ok(Some(response.id))
    }

    #[instrument(skip_all)]
    async fn finalize(
        &mut self,
        source: &dyn AssetSource,
        cancel: &CancellationToken,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<RunReport> {
        info!("Phase 3: Creating stacks");
        let stacks_created = self.create_stacks(cancel).await?;

        info!("Phase 4: Reconciling albums");
        let albums = self.reconcile_albums(cancel).await?;

        info!("Phase 5: Deleting replaced server assets");
        let server_assets_deleted = self.delete_server_assets(cancel).await?;

        info!("Phase 6: Deleting local files");
        let (local_files_deleted, local_failures) = self.delete_local_files(source, cancel).await?;

        let (albums, album_failures) = match albums {
            Ok(report) => (report, Vec::new()),
            Err(SyncError::AlbumReconciliation { failures, report }) => (report, failures),
            Err(e) => return Err(e),
        };

        let report = RunReport {
            dry_run: self.config.dry_run,
            started_at,
            finished_at: self.clock.now(),
            scanned: self.context.scanned,
            uploaded: self.context.uploaded,
            stacks_created,
            albums: albums.clone(),
            server_assets_deleted,
            local_files_deleted,
            actions: self.context.journal.counts().clone(),
        };
        report.log();

        if !local_failures.is_empty() {
            let mut message = local_failures.join("; ");
            if !album_failures.is_empty() {
                message.push_str(&format!(
                    " (also failed to reconcile albums: {})",
                    album_failures.join("; ")
                ));
            }
            return Err(SyncError::LocalDelete(message));
        }
        if !album_failures.is_empty() {
            return Err(SyncError::AlbumReconciliation {
                failures: album_failures,
                report: albums,
            });
        }
        Ok(report)
    }

    fn wants_stack(&self, stack: &Stack) -> bool {
        match stack.stack_type {
            StackType::Burst => self.config.stack_burst,
            StackType::RawJpg => self.config.stack_jpg_raw,
        }
    }

    async fn create_stacks(&mut self, cancel: &CancellationToken) -> Result<usize> {
        if !self.config.create_stacks {
            return Ok(0);
        }

        let stacks: Vec<Stack> = self
            .context
            .stacks
            .stacks()
            .into_iter()
            .filter(|s| self.wants_stack(s))
            .collect();

        let mut created = 0;
        for stack in stacks {
            if self.config.dry_run {
                info!(
                    "Would stack {} ({}) under {}",
                    stack.names.join(", "),
                    stack.stack_type,
                    stack.names[0]
                );
                created += 1;
                continue;
            }

            ensure_active(cancel)?;
            match self
                .server
                .stack_assets(&stack.cover_id, stack.member_ids())
                .await
            {
                Ok(()) => {
                    debug!(cover = %stack.cover_id, "Stacked {}", stack.names.join(", "));
                    created += 1;
                }
                Err(e) => warn!("Can't stack {}: {}", stack.names.join(", "), e),
            }
        }

        info!("{} stack(s) created", created);
        Ok(created)
    }

    /// Outer error: cancellation. Inner error: reconciliation failures,
    /// reported once the deletions ran.
    async fn reconcile_albums(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Result<AlbumReport>> {
        let reconciler = mem::take(&mut self.context.albums);
        if !self.config.manages_albums() {
            debug!("Album management disabled");
            return Ok(Ok(AlbumReport::default()));
        }
        if reconciler.is_empty() {
            return Ok(Ok(AlbumReport::default()));
        }

        ensure_active(cancel)?;
        let existing = match self.server.list_albums().await {
            Ok(albums) => albums,
            Err(e) => {
                warn!("Can't get the album list from the server: {}", e);
                return Ok(Err(SyncError::AlbumReconciliation {
                    failures: vec![format!("album list: {}", e)],
                    report: AlbumReport::default(),
                }));
            }
        };

        ensure_active(cancel)?;
        Ok(reconciler
            .reconcile(&existing, self.server.as_ref(), self.config.dry_run)
            .await)
    }

    async fn delete_server_assets(&mut self, cancel: &CancellationToken) -> Result<usize> {
        let ids = mem::take(&mut self.context.server_deletes);
        if ids.is_empty() {
            return Ok(0);
        }

        warn!("{} server asset(s) to delete", ids.len());
        if self.config.dry_run {
            warn!("Server deletion skipped, dry run");
            return Ok(ids.len());
        }

        ensure_active(cancel)?;
        self.server
            .delete_assets(&ids, false)
            .await
            .map_err(|e| SyncError::ServerDelete(e.to_string()))?;
        Ok(ids.len())
    }

    async fn delete_local_files(
        &mut self,
        source: &dyn AssetSource,
        cancel: &CancellationToken,
    ) -> Result<(usize, Vec<String>)> {
        let assets = mem::take(&mut self.context.local_deletes);
        if assets.is_empty() {
            return Ok((0, Vec::new()));
        }

        info!("{} local file(s) to delete", assets.len());
        let mut deleted = 0;
        let mut failures = Vec::new();
        for asset in assets {
            if self.config.dry_run {
                warn!("File '{}' not deleted, dry run", strip_path(&asset.file_name));
                continue;
            }

            ensure_active(cancel)?;
            match source.remove(&asset).await {
                Ok(()) => {
                    warn!("Deleted file '{}'", strip_path(&asset.file_name));
                    deleted += 1;
                }
                Err(e) => failures.push(format!("{}: {}", asset.file_name, e)),
            }
        }

        Ok((deleted, failures))
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(SyncError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        AlbumAddResult, AssetUpdate, BridgeError, ServerAlbum, ServerAsset,
    };
    use mockall::mock;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

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

    struct VecSource(Vec<LocalAsset>);

    #[async_trait]
    impl AssetSource for VecSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Folder
        }

        async fn browse(&self, _cancel: CancellationToken) -> BridgeResult<UnboundedReceiver<SourceItem>> {
            let (tx, rx) = unbounded_channel();
            for asset in &self.0 {
                let _ = tx.send(SourceItem::Asset(asset.clone()));
            }
            Ok(rx)
        }

        async fn remove(&self, _asset: &LocalAsset) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_prepare_fails_when_catalogue_unavailable() {
        let mut server = MockServer::new();
        server
            .expect_list_assets()
            .times(1)
            .returning(|| Err(BridgeError::NotAvailable("offline".to_string())));
        server.expect_upload().never();

        let mut coordinator = UploadCoordinator::new(Arc::new(server), UploadConfig::default());
        let source = VecSource(vec![LocalAsset::new("a.jpg", 1)]);

        let err = coordinator
            .run(&source, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ServerCatalog(_)));
    }

    #[tokio::test]
    async fn test_failed_upload_is_journaled_and_run_continues() {
        let mut server = MockServer::new();
        server.expect_list_assets().returning(|| Ok(Vec::new()));
        server.expect_upload().times(2).returning(|asset| {
            if asset.file_name == "bad.jpg" {
                Err(BridgeError::Server {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(UploadResponse {
                    id: "srv-good".to_string(),
                    duplicate: false,
                })
            }
        });

        let mut coordinator = UploadCoordinator::new(Arc::new(server), UploadConfig::default());
        let source = VecSource(vec![LocalAsset::new("bad.jpg", 1), LocalAsset::new("good.jpg", 2)]);

        let report = coordinator.run(&source, CancellationToken::new()).await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.uploaded, 1);
        assert_eq!(coordinator.context().journal.count(JournalAction::ServerError), 1);
    }

    #[tokio::test]
    async fn test_duplicate_upload_response_is_not_registered() {
        let mut server = MockServer::new();
        server.expect_list_assets().returning(|| Ok(Vec::new()));
        server.expect_upload().times(1).returning(|_| {
            Ok(UploadResponse {
                id: "existing".to_string(),
                duplicate: true,
            })
        });

        let mut coordinator = UploadCoordinator::new(Arc::new(server), UploadConfig::default());
        let source = VecSource(vec![LocalAsset::new("a.jpg", 1)]);

        let report = coordinator.run(&source, CancellationToken::new()).await.unwrap();
        assert_eq!(report.uploaded, 0);
        assert!(coordinator.context().index.get("existing").is_none());
        assert_eq!(
            coordinator.context().journal.count(JournalAction::ServerDuplicate),
            1
        );
    }
}
