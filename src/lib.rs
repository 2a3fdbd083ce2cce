//! Workspace facade crate.
//!
//! Exposes feature flags that map to the individual workspace crates so a host
//! binary can depend on `photo-sync-workspace` alone:
//!
//! - `core` (default): `core-sync`, `core-runtime`, `bridge-traits`
//! - `local-folder` (default): the `provider-local-folder` asset source

#[cfg(feature = "core")]
pub use bridge_traits;
#[cfg(feature = "core")]
pub use core_runtime;
#[cfg(feature = "core")]
pub use core_sync;
#[cfg(feature = "local-folder")]
pub use provider_local_folder;
