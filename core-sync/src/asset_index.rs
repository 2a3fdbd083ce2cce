//! Server Asset Index
//!
//! In-memory catalogue of what the server already holds, searchable by
//! device-asset-ID and by file name.
//!
//! ## Overview
//!
//! The index is built once from `PhotoServer::list_assets` at the start of a
//! run and only grows afterwards: every successful upload is appended with
//! [`AssetIndex::add_uploaded`] so that later files in the same run see it.
//! Assets live in one vector; the two hash maps store positions into it.

use bridge_traits::source::base_name;
use bridge_traits::{LocalAsset, ServerAsset};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct AssetIndex {
    assets: Vec<ServerAsset>,
    by_device_id: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
}

impl AssetIndex {
    /// Build the index from the server catalogue, skipping trashed assets
    pub fn new(assets: impl IntoIterator<Item = ServerAsset>) -> Self {
        let mut index = Self::default();
        for asset in assets.into_iter().filter(|a| !a.is_trashed) {
            index.insert(asset);
        }
        index
    }

    fn insert(&mut self, asset: ServerAsset) -> usize {
        let position = self.assets.len();
        if let Some(device_id) = asset.device_asset_id.as_ref() {
            self.by_device_id.insert(device_id.clone(), position);
        }
        self.by_name
            .entry(base_name(&asset.original_file_name).to_string())
            .or_default()
            .push(position);
        self.assets.push(asset);
        position
    }

    /// Record an asset uploaded during this run
    ///
    /// The entry is flagged `just_uploaded` and indexed under the local
    /// device-asset-ID and effective file name.
    pub fn add_uploaded(&mut self, local: &LocalAsset, server_id: impl Into<String>) -> &ServerAsset {
        let asset = ServerAsset {
            id: server_id.into(),
            device_asset_id: Some(local.device_asset_id()),
            original_file_name: local.effective_file_name(),
            capture_time: local.capture_time,
            file_size: local.size,
            is_archived: local.archived,
            is_trashed: false,
            albums: Vec::new(),
            just_uploaded: true,
        };
        let position = self.insert(asset);
        &self.assets[position]
    }

    pub fn by_device_id(&self, device_id: &str) -> Option<&ServerAsset> {
        self.by_device_id.get(device_id).map(|&i| &self.assets[i])
    }

    /// Assets sharing a base name, in insertion order
    pub fn by_name<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ServerAsset> + 'a {
        self.by_name
            .get(base_name(name))
            .into_iter()
            .flatten()
            .map(move |&i| &self.assets[i])
    }

    pub fn get(&self, id: &str) -> Option<&ServerAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerAsset> {
        self.assets.iter()
    }
}
