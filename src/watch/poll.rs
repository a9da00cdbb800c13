//! Polling fallback: walk the tree on an interval and diff against the last walk.
//!
//! Files are fingerprinted by size and modification time. A path seen for the
//! first time is `Created`; a known path whose fingerprint moved is `Modified`.
//! The first walk starts from an empty snapshot, so files already present when
//! polling starts are reported too.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, SystemTime},
};

use ignore::WalkBuilder;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::{EventKind, WatchEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

/// Every regular file under a root at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, Fingerprint>,
}

impl Snapshot {
    /// Walks `root` recursively. Unreadable entries are skipped.
    ///
    /// All of `ignore`'s filters are off: hidden files and ignored paths
    /// are still reported and left to the stability filter.
    pub fn scan(root: &Path) -> Self {
        let mut files = BTreeMap::new();

        let walker = WalkBuilder::new(root).standard_filters(false).build();
        for entry in walker.flatten() {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            files.insert(
                entry.into_path(),
                Fingerprint {
                    len: metadata.len(),
                    modified: metadata.modified().ok(),
                },
            );
        }

        Self { files }
    }

    /// Events that turn `previous` into `self`. Removals produce nothing.
    pub fn changes_since(&self, previous: &Snapshot) -> Vec<WatchEvent> {
        self.files
            .iter()
            .filter_map(|(path, fingerprint)| {
                let kind = match previous.files.get(path) {
                    None => EventKind::Created,
                    Some(old) if old != fingerprint => EventKind::Modified,
                    Some(_) => return None,
                };
                Some(WatchEvent {
                    path: path.clone(),
                    kind,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Background polling thread. Dropping the handle stops it after its current cycle.
pub struct PollWatcher {
    interval: Duration,
    stop: Arc<AtomicBool>,
}

impl PollWatcher {
    pub fn spawn(root: &Path, interval: Duration, tx: UnboundedSender<WatchEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let root = root.to_path_buf();

        thread::spawn(move || poll_loop(&root, interval, &tx, &flag));

        Self { interval, stop }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for PollWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn poll_loop(root: &Path, interval: Duration, tx: &UnboundedSender<WatchEvent>, stop: &AtomicBool) {
    let mut previous = Snapshot::default();

    while !stop.load(Ordering::Relaxed) {
        let current = Snapshot::scan(root);
        for event in current.changes_since(&previous) {
            if stop.load(Ordering::Relaxed) || tx.send(event).is_err() {
                return;
            }
        }
        previous = current;
        thread::sleep(interval);
    }

    debug!(root = %root.display(), files = previous.len(), "polling stopped");
}
