//! Advice Dispatch
//!
//! Turns an [`Advice`] into the ordered list of actions the coordinator
//! executes for one asset.
//!
//! ## Overview
//!
//! [`plan_asset`] is pure: it never talks to the server. It returns an
//! [`AssetPlan`] whose actions the coordinator runs in order:
//!
//! | Verdict | Plan |
//! |---------|------|
//! | `NotOnServer` | upload, then queue the local file for deletion when asked |
//! | `SmallerOnServer` | journal the upgrade, carry the server albums over, upload; a failed upload queues the old server copy for deletion |
//! | `BetterOnServer` | keep the server copy, file it into the local albums |
//! | `SameOnServer` | keep the server copy, file it into the albums, queue the local file for deletion when asked; stop for files uploaded earlier in this run |
//! | `IDontKnow` | journal an error and stop |
//!
//! Every plan that keeps going ends with the album policy and a metadata
//! update when the local asset carries any metadata.

use crate::advice::{Advice, Verdict};
use crate::journal::JournalAction;
use bridge_traits::source::base_name;
use bridge_traits::{AssetUpdate, LocalAlbum, LocalAsset, SourceKind};
use core_runtime::config::UploadConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Journal(JournalAction, String),
    /// Add these server album names to the local asset before uploading it
    MergeServerAlbums(Vec<String>),
    /// Upload the local asset; on failure run `on_failure` and drop the rest
    Upload { on_failure: Vec<Action> },
    /// Desire the target asset in this album
    JoinAlbum(String),
    QueueLocalDelete,
    QueueServerDelete(String),
    UpdateMetadata(AssetUpdate),
    Stop,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetPlan {
    /// Server asset the actions apply to; set by the upload when `None`
    pub target: Option<String>,
    pub actions: Vec<Action>,
}

impl AssetPlan {
    fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    fn journal(&mut self, action: JournalAction, message: impl Into<String>) {
        self.push(Action::Journal(action, message.into()));
    }

    /// Queue album joins, skipping names already joined by this plan
    fn join_albums(&mut self, names: impl IntoIterator<Item = String>) {
        for name in names {
            let already = self
                .actions
                .iter()
                .any(|a| matches!(a, Action::JoinAlbum(n) if *n == name));
            if !already {
                self.push(Action::JoinAlbum(name));
            }
        }
    }

    pub fn uploads(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, Action::Upload { .. }))
    }

    /// Album names this plan joins, in order
    pub fn album_names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().filter_map(|a| match a {
            Action::JoinAlbum(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Name under which a source album is created on the server
pub fn album_name<'a>(album: &'a LocalAlbum, config: &UploadConfig, kind: SourceKind) -> &'a str {
    if kind == SourceKind::Archive {
        if config.use_folder_as_album_name
            || (config.keep_untitled && album.name.trim().is_empty())
        {
            return base_name(&album.path);
        }
    }
    &album.name
}

/// Albums an asset is filed into once it is on the server
pub fn album_targets(asset: &LocalAsset, config: &UploadConfig, kind: SourceKind) -> Vec<String> {
    if let Some(name) = config.import_into_album.as_ref() {
        return vec![name.clone()];
    }

    match kind {
        SourceKind::Archive if config.create_albums || config.partner_album.is_some() => {
            let mut names: Vec<String> = asset
                .albums
                .iter()
                .map(|album| album_name(album, config, kind).to_string())
                .collect();
            if let Some(partner) = config.partner_album.as_ref().filter(|_| asset.from_partner) {
                names.push(partner.clone());
            }
            names.retain(|name| !name.is_empty());
            names
        }
        SourceKind::Folder if config.create_album_after_folder => asset
            .parent_folder()
            .map(|folder| vec![folder.to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Albums of the local asset, joined explicitly when the server copy is kept
fn kept_copy_albums(asset: &LocalAsset, config: &UploadConfig, kind: SourceKind) -> Vec<String> {
    let mut names = Vec::new();
    if config.create_albums {
        names.extend(
            asset
                .albums
                .iter()
                .map(|album| album_name(album, config, kind).to_string())
                .filter(|name| !name.is_empty()),
        );
    }
    if let Some(partner) = config.partner_album.as_ref().filter(|_| asset.from_partner) {
        names.push(partner.clone());
    }
    names
}

/// Album policy and metadata update shared by every plan that keeps going
fn common_tail(plan: &mut AssetPlan, asset: &LocalAsset, config: &UploadConfig, kind: SourceKind) {
    let targets = album_targets(asset, config, kind);
    if !targets.is_empty() {
        plan.journal(JournalAction::Album, targets.join(", "));
        plan.join_albums(targets);
    }

    if let Some(update) = AssetUpdate::from_local(asset) {
        plan.push(Action::UpdateMetadata(update));
    }
}

/// Plan what to do with `asset` given its advice
pub fn plan_asset(
    advice: &Advice,
    asset: &LocalAsset,
    config: &UploadConfig,
    kind: SourceKind,
) -> AssetPlan {
    let mut plan = AssetPlan::default();

    match &advice.verdict {
        Verdict::IDontKnow => {
            plan.journal(JournalAction::Error, advice.message.clone());
            plan.push(Action::Stop);
        }

        Verdict::NotOnServer => {
            plan.push(Action::Upload {
                on_failure: Vec::new(),
            });
            if config.delete_local {
                plan.push(Action::QueueLocalDelete);
            }
            common_tail(&mut plan, asset, config, kind);
        }

        Verdict::SmallerOnServer(server) => {
            plan.journal(JournalAction::Upgraded, advice.message.clone());

            let mut upgraded = asset.clone();
            let server_albums: Vec<String> =
                server.albums.iter().map(|album| album.name.clone()).collect();
            if !server_albums.is_empty() {
                for name in &server_albums {
                    plan.journal(JournalAction::Info, format!("Added to album: {}", name));
                    upgraded.add_album(LocalAlbum::named(name.clone()));
                }
                plan.push(Action::MergeServerAlbums(server_albums));
            }

            plan.push(Action::Upload {
                on_failure: vec![Action::QueueServerDelete(server.id.clone())],
            });
            common_tail(&mut plan, &upgraded, config, kind);
        }

        Verdict::SameOnServer(server) if server.just_uploaded => {
            plan.journal(JournalAction::LocalDuplicate, advice.message.clone());
            plan.target = Some(server.id.clone());

            // the copy uploaded earlier in this run also belongs to these
            // albums; the local file stays
            let mut names = kept_copy_albums(asset, config, kind);
            if let Some(import) = config.import_into_album.as_ref() {
                names.push(import.clone());
            }
            plan.join_albums(names);
            plan.push(Action::Stop);
        }

        Verdict::SameOnServer(server) => {
            plan.journal(JournalAction::ServerDuplicate, advice.message.clone());
            plan.target = Some(server.id.clone());

            let mut names = kept_copy_albums(asset, config, kind);
            if let Some(import) = config.import_into_album.as_ref() {
                names.push(import.clone());
            }
            plan.join_albums(names);

            if config.delete_local {
                plan.push(Action::QueueLocalDelete);
            }
            common_tail(&mut plan, asset, config, kind);
        }

        Verdict::BetterOnServer(server) => {
            plan.journal(JournalAction::ServerBetter, advice.message.clone());
            plan.target = Some(server.id.clone());
            plan.join_albums(kept_copy_albums(asset, config, kind));
            common_tail(&mut plan, asset, config, kind);
        }
    }

    plan
}
