//! Atomically swapped manifest snapshots.
//!
//! # Responsibilities
//! - Publish the current manifest behind an `ArcSwap`
//! - Rebuild on watcher add/remove events, keeping the previous snapshot
//!   when a rebuild fails
//!
//! # Design Decisions
//! - `load()` hands out an `Arc`; a request takes one at dispatch start
//!   and uses it for its whole lifetime
//! - A failed scan or build never replaces a working manifest

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::modules::ModuleLoader;

use super::builder::{build, BuilderPaths};
use super::types::{RouteManifest, RouteTreeSource};

/// A filesystem event relevant to the route tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Add(PathBuf),
    Remove(PathBuf),
}

/// Holder of the current manifest snapshot.
pub struct ManifestCell {
    inner: ArcSwap<RouteManifest>,
}

impl ManifestCell {
    pub fn new(initial: RouteManifest) -> Self {
        Self {
            inner: ArcSwap::from_pointee(initial),
        }
    }

    /// The current snapshot. Cheap; safe to call per request.
    pub fn load(&self) -> Arc<RouteManifest> {
        self.inner.load_full()
    }

    /// Replace the snapshot wholesale. In-flight requests holding the
    /// previous `Arc` are unaffected.
    pub fn store(&self, manifest: RouteManifest) {
        self.inner.store(Arc::new(manifest));
    }
}

/// Spawn the rebuild task: one full scan-and-build per watcher event.
pub fn spawn_rebuilder(
    cell: Arc<ManifestCell>,
    source: Arc<dyn RouteTreeSource>,
    paths: BuilderPaths,
    loader: Arc<dyn ModuleLoader>,
    mut events: mpsc::UnboundedReceiver<FsEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::info!(event = ?event, "route tree changed, rebuilding manifest");

            let tree = match source.scan() {
                Ok(tree) => tree,
                Err(err) => {
                    tracing::error!(error = %err, "route tree scan failed, keeping current manifest");
                    continue;
                }
            };

            match build(&tree, &paths, Arc::clone(&loader)) {
                Ok(manifest) => cell.store(manifest),
                Err(err) => {
                    tracing::error!(error = %err, "manifest rebuild failed, keeping current manifest");
                }
            }
        }
    })
}
