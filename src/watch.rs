//! Directory watching: an endless stream of create/modify events under a root.
//!
//! Two producers feed the same channel:
//!
//! - `native`: OS change notifications via `notify`, recursive.
//! - `poll`: a periodic tree walk diffed against the previous walk.
//!
//! [`Watcher::start`] probes once at startup. In [`WatchMode::Auto`] it
//! prefers native notifications and falls back to polling when the
//! subscription can't be established (missing root, inotify limits, ...).
//! Either way consumers just call [`Watcher::next`].

mod native;
mod poll;

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::sync::mpsc;
use tracing::{info, warn};

pub use native::NativeWatcher;
pub use poll::{PollWatcher, Snapshot};

/// Default interval between polling walks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to watch {}: {source}", root.display())]
    Subscribe {
        root: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Modified,
}

/// One change somewhere under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

/// Which producer to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchMode {
    /// Native notifications, polling if they can't be set up.
    #[default]
    Auto,
    Native,
    Polling,
}

enum Source {
    Native(NativeWatcher),
    Polling(PollWatcher),
}

/// A running watcher. Dropping it stops the producer.
pub struct Watcher {
    events: mpsc::UnboundedReceiver<WatchEvent>,
    source: Source,
}

impl Watcher {
    /// Starts watching `root` recursively.
    pub fn start(root: &Path, mode: WatchMode, poll_interval: Duration) -> Result<Self, WatchError> {
        let (tx, events) = mpsc::unbounded_channel();

        let source = match mode {
            WatchMode::Polling => Source::Polling(PollWatcher::spawn(root, poll_interval, tx)),
            WatchMode::Native => Source::Native(NativeWatcher::spawn(root, tx)?),
            WatchMode::Auto => match NativeWatcher::spawn(root, tx.clone()) {
                Ok(native) => Source::Native(native),
                Err(e) => {
                    warn!(error = %e, "native file notifications unavailable, falling back to polling");
                    Source::Polling(PollWatcher::spawn(root, poll_interval, tx))
                }
            },
        };

        let watcher = Self { events, source };
        info!(root = %root.display(), mode = %watcher, "watching for new files");
        Ok(watcher)
    }

    /// Waits for the next change. `None` only once the producer has stopped.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.source, Source::Polling(_))
    }
}

impl fmt::Display for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Native(_) => f.write_str("native"),
            Source::Polling(p) => write!(f, "polling every {}ms", p.interval().as_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;
    use tokio::time::timeout;

    const FAST: Duration = Duration::from_millis(50);

    async fn next_for(watcher: &mut Watcher, path: &Path) -> WatchEvent {
        timeout(Duration::from_secs(5), async {
            loop {
                let event = watcher.next().await.expect("watcher stopped");
                if event.path == path {
                    return event;
                }
            }
        })
        .await
        .expect("no event for file")
    }

    #[tokio::test]
    async fn auto_falls_back_to_polling_when_root_is_missing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("not-yet");

        let watcher = Watcher::start(&missing, WatchMode::Auto, FAST).unwrap();
        assert!(watcher.is_polling());
    }

    #[tokio::test]
    async fn native_mode_reports_subscription_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("not-yet");

        let err = Watcher::start(&missing, WatchMode::Native, FAST).err().unwrap();
        assert!(matches!(err, WatchError::Subscribe { .. }));
    }

    #[tokio::test]
    async fn polling_reports_files_in_new_subdirectories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let mut watcher = Watcher::start(&root, WatchMode::Polling, FAST).unwrap();

        let nested = root.join("tactical/Detection");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("y.kml");
        fs::write(&file, "<kml/>").unwrap();

        let event = next_for(&mut watcher, &file).await;
        assert_eq!(event.kind, EventKind::Created);
    }

    #[tokio::test]
    async fn auto_reports_new_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let mut watcher = Watcher::start(&root, WatchMode::Auto, FAST).unwrap();

        let file = root.join("z.ts");
        fs::write(&file, "frames").unwrap();

        let event = next_for(&mut watcher, &file).await;
        assert_eq!(event.path, file);
    }
}
