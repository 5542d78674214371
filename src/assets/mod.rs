//! Asset manifest loading.
//!
//! An [`AssetManifest`] names every sound a scene may play. [`AssetLoadHandle::spawn`]
//! validates it, decodes every entry on its own loading thread, and hands back a
//! handle whose [`wait`](AssetLoadHandle::wait) yields the immutable [`LoadedAssets`]
//! set once *all* entries are playable, or the first failure.
//!
//! The dispatcher can only be built from a [`LoadedAssets`], so collisions can never
//! be wired up before loading has resolved.

mod handle;
mod manifest;
mod signal;

pub use handle::{AssetLoadHandle, LoadedAssets};
pub use manifest::{AssetEntry, AssetManifest, AudioAssetDescriptor};
pub use signal::{LoadSignal, LoadSignalSender};
