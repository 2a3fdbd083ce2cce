//! Run Journal
//!
//! Per-file log of what the run did with each asset, and the report built
//! from it.
//!
//! Every record is also emitted as a `tracing` event so the journal and the
//! log tell the same story; errors are logged at `warn`, routine decisions at
//! `debug`.

use crate::albums::AlbumReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalAction {
    Error,
    NotSelected,
    Uploaded,
    Upgraded,
    ServerDuplicate,
    LocalDuplicate,
    ServerBetter,
    ServerError,
    Album,
    Info,
}

impl JournalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::NotSelected => "not_selected",
            Self::Uploaded => "uploaded",
            Self::Upgraded => "upgraded",
            Self::ServerDuplicate => "server_duplicate",
            Self::LocalDuplicate => "local_duplicate",
            Self::ServerBetter => "server_better",
            Self::ServerError => "server_error",
            Self::Album => "album",
            Self::Info => "info",
        }
    }

    fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::ServerError)
    }
}

impl std::fmt::Display for JournalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub action: JournalAction,
    pub file_name: String,
    pub message: String,
}

#[derive(Debug, Default, Clone)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    counts: BTreeMap<JournalAction, usize>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        action: JournalAction,
        file_name: impl Into<String>,
        message: impl Into<String>,
    ) {
        let entry = JournalEntry {
            action,
            file_name: file_name.into(),
            message: message.into(),
        };

        if action.is_failure() {
            warn!(action = %action, file = %entry.file_name, "{}", entry.message);
        } else {
            debug!(action = %action, file = %entry.file_name, "{}", entry.message);
        }

        *self.counts.entry(action).or_default() += 1;
        self.entries.push(entry);
    }

    pub fn count(&self, action: JournalAction) -> usize {
        self.counts.get(&action).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Entries recorded for one file, in order
    pub fn for_file<'a>(&'a self, file_name: &'a str) -> impl Iterator<Item = &'a JournalEntry> {
        self.entries.iter().filter(move |e| e.file_name == file_name)
    }

    pub fn counts(&self) -> &BTreeMap<JournalAction, usize> {
        &self.counts
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Assets received from the source, rejected ones included
    pub scanned: usize,
    pub uploaded: usize,
    pub stacks_created: usize,
    pub albums: AlbumReport,
    pub server_assets_deleted: usize,
    pub local_files_deleted: usize,
    pub actions: BTreeMap<JournalAction, usize>,
}

impl RunReport {
    /// Log the report at `info`, and as JSON at `debug`
    pub fn log(&self) {
        info!(
            dry_run = self.dry_run,
            scanned = self.scanned,
            uploaded = self.uploaded,
            stacks = self.stacks_created,
            albums_created = self.albums.albums_created,
            server_deleted = self.server_assets_deleted,
            local_deleted = self.local_files_deleted,
            "Upload run finished in {}s",
            (self.finished_at - self.started_at).num_seconds()
        );
        for (action, count) in &self.actions {
            info!("{:>18}: {}", action.as_str(), count);
        }
        match serde_json::to_string(self) {
            Ok(json) => debug!(report = %json, "Run report"),
            Err(e) => warn!("Failed to serialize run report: {}", e),
        }
    }
}
