//! Routes directory watcher.
//!
//! Bridges `notify` filesystem events onto the rebuild channel. Only
//! create and remove events change the shape of the route tree, so only
//! those are forwarded; content edits are the module loader's business.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::cell::FsEvent;

/// Watches the routes directory and emits add/remove events.
pub struct RouteWatcher {
    path: PathBuf,
    events_tx: mpsc::UnboundedSender<FsEvent>,
}

impl RouteWatcher {
    /// Create a watcher for the given routes directory.
    ///
    /// Returns the watcher and the receiver the rebuild task consumes.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<FsEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                events_tx,
            },
            events_rx,
        )
    }

    /// Start watching in a background thread. The returned watcher must
    /// be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.events_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let forward = match event.kind {
                        EventKind::Create(_) => FsEvent::Add,
                        EventKind::Remove(_) => FsEvent::Remove,
                        _ => return,
                    };
                    for path in event.paths {
                        let _ = tx.send(forward(path));
                    }
                }
                Err(e) => tracing::error!("watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::Recursive)?;

        tracing::info!(path = ?self.path, "route watcher started");
        Ok(watcher)
    }
}
