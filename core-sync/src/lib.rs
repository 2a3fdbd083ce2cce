//! # Photo Sync Core
//!
//! Decides what to do with each local media asset and drives the upload run.
//!
//! ## Overview
//!
//! This crate holds the decision logic between a local collection and a
//! photo server:
//! - Avoiding duplicate uploads and replacing inferior server copies
//! - Grouping raw/compressed pairs and bursts into stacks
//! - Reconciling album membership with the fewest server calls
//! - Deleting replaced server assets and, on request, uploaded local files
//!
//! ## Components
//!
//! - **Asset Index** (`asset_index`): Server catalogue searchable by device ID and file name
//! - **Advice** (`advice`): Compares a local asset with the catalogue
//! - **Dispatch** (`dispatch`): Turns advice into an ordered action plan
//! - **Selection** (`selection`): Partner, trash, album, archive and date filters
//! - **Stack Builder** (`stacking`): Raw+JPEG pairs and burst sequences
//! - **Album Reconciliation** (`albums`): Desired membership to create/add calls
//! - **Journal** (`journal`): Per-file action log and run report
//! - **Upload Coordinator** (`coordinator`): Runs the whole pipeline

pub mod advice;
pub mod albums;
pub mod asset_index;
pub mod context;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod journal;
pub mod selection;
pub mod stacking;

pub use advice::{compare_dates, evaluate, format_bytes, Advice, Verdict};
pub use albums::{AlbumOperation, AlbumReconciler, AlbumReport};
pub use asset_index::AssetIndex;
pub use context::RunContext;
pub use coordinator::UploadCoordinator;
pub use dispatch::{plan_asset, Action, AssetPlan};
pub use error::{Result, SyncError};
pub use journal::{Journal, JournalAction, JournalEntry, RunReport};
pub use selection::Selection;
pub use stacking::{Stack, StackBuilder, StackType};
