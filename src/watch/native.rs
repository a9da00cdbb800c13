//! Native change notifications.
//!
//! `notify` calls back on its own thread; events are translated and pushed
//! into the watcher channel without blocking.

use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use super::{EventKind, WatchError, WatchEvent};

/// Holds the OS subscription. Dropping it unsubscribes.
pub struct NativeWatcher {
    _watcher: RecommendedWatcher,
}

impl NativeWatcher {
    /// Subscribes to everything under `root`, including directories created later.
    pub fn spawn(root: &Path, tx: UnboundedSender<WatchEvent>) -> Result<Self, WatchError> {
        let subscribe = |source| WatchError::Subscribe {
            root: root.to_path_buf(),
            source,
        };

        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    let Some(kind) = translate(event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        // Receiver gone means the watcher is shutting down.
                        if tx.send(WatchEvent { path, kind }).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, "file notification error"),
            })
            .map_err(subscribe)?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(subscribe)?;

        Ok(Self { _watcher: watcher })
    }
}

/// Only creations and modifications matter; removals and reads are dropped.
fn translate(kind: notify::EventKind) -> Option<EventKind> {
    match kind {
        notify::EventKind::Create(_) => Some(EventKind::Created),
        notify::EventKind::Modify(_) => Some(EventKind::Modified),
        _ => None,
    }
}
