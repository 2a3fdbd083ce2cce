//! Run-scoped state shared by the steps of one upload run.

use crate::albums::AlbumReconciler;
use crate::asset_index::AssetIndex;
use crate::journal::{Journal, JournalAction};
use crate::stacking::StackBuilder;
use bridge_traits::LocalAsset;

/// Everything a run accumulates between `prepare` and finalization
///
/// The coordinator consumes assets one at a time, so plain owned structures
/// are enough.
#[derive(Debug, Default)]
pub struct RunContext {
    pub index: AssetIndex,
    pub stacks: StackBuilder,
    pub albums: AlbumReconciler,
    pub journal: Journal,
    /// Server assets to delete once the stream is exhausted
    pub server_deletes: Vec<String>,
    /// Local files to delete once everything else is done
    pub local_deletes: Vec<LocalAsset>,
    pub scanned: usize,
    pub uploaded: usize,
    stacking: bool,
}

impl RunContext {
    pub fn new(index: AssetIndex, stacking: bool) -> Self {
        Self {
            index,
            stacking,
            ..Self::default()
        }
    }

    /// Register an asset the server accepted as new
    ///
    /// Makes it visible to later advice and to the stack builder.
    pub fn register_uploaded(&mut self, asset: &LocalAsset, server_id: &str) {
        self.journal
            .record(JournalAction::Uploaded, &asset.file_name, asset.title.clone());
        self.index.add_uploaded(asset, server_id);
        self.uploaded += 1;
        if self.stacking {
            self.stacks
                .process_asset(server_id, asset.file_name.clone(), asset.capture_time);
        }
    }

    pub fn queue_server_delete(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.server_deletes.contains(&id) {
            self.server_deletes.push(id);
        }
    }

    pub fn queue_local_delete(&mut self, asset: &LocalAsset) {
        if !self.local_deletes.iter().any(|a| a.origin == asset.origin) {
            self.local_deletes.push(asset.clone());
        }
    }
}
