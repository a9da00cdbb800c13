//! Stability filtering: decide when a changed file is ready to act on.
//!
//! A file is forwarded at most once per run, and only after its size has
//! held still across a short settle window. The processed set lives in
//! memory only: a restart forgets it, so files written while the previous
//! run was stopping may be uploaded again.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use tracing::debug;

/// Default settle window between the two size probes.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Paths already forwarded this run. Cheap to clone; clones share the set.
#[derive(Debug, Clone, Default)]
pub struct ProcessedFiles(Arc<Mutex<HashSet<PathBuf>>>);

impl ProcessedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.lock().contains(path)
    }

    /// Records `path`. Returns `false` if it was already there.
    pub fn insert(&self, path: &Path) -> bool {
        self.0.lock().insert(path.to_path_buf())
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// Paths with a probe pending. At most one probe runs per path; events that
/// arrive meanwhile only ask it to look again.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<Mutex<HashMap<PathBuf, bool>>>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `path` for a new probe. Returns `false` if one is already
    /// pending; that probe is then flagged to re-check.
    pub fn claim(&self, path: &Path) -> bool {
        let mut pending = self.0.lock();
        if let Some(recheck) = pending.get_mut(path) {
            *recheck = true;
            false
        } else {
            pending.insert(path.to_path_buf(), false);
            true
        }
    }

    /// Ends a probe. With `wants_recheck`, returns `true` and keeps the claim
    /// if events arrived since the last call; otherwise releases it.
    pub fn finish(&self, path: &Path, wants_recheck: bool) -> bool {
        let mut pending = self.0.lock();
        if wants_recheck
            && let Some(recheck) = pending.get_mut(path)
            && *recheck
        {
            *recheck = false;
            return true;
        }
        pending.remove(path);
        false
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// Why a path will never be forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Dotfile or `~$` lock file.
    TempFile,
    Directory,
    AlreadyProcessed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Stable, and now recorded as processed.
    Forward,
    Rejected(Rejection),
    /// Still being written, or couldn't be probed. A later event may retry.
    NotStable,
}

#[derive(Debug, Clone)]
pub struct StabilityFilter {
    processed: ProcessedFiles,
    settle: Duration,
}

impl StabilityFilter {
    pub fn new(processed: ProcessedFiles, settle: Duration) -> Self {
        Self { processed, settle }
    }

    pub fn processed(&self) -> &ProcessedFiles {
        &self.processed
    }

    /// Rejections that need no filesystem access.
    pub fn screen(&self, path: &Path) -> Option<Rejection> {
        if is_temp_file(path) {
            Some(Rejection::TempFile)
        } else if self.processed.contains(path) {
            Some(Rejection::AlreadyProcessed)
        } else {
            None
        }
    }

    /// Probes `path` and decides. `Forward` is returned at most once per path.
    pub async fn check(&self, path: &Path) -> Verdict {
        if let Some(rejection) = self.screen(path) {
            return Verdict::Rejected(rejection);
        }

        let before = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "probe failed");
                return Verdict::NotStable;
            }
        };
        if before.is_dir() {
            return Verdict::Rejected(Rejection::Directory);
        }

        tokio::time::sleep(self.settle).await;

        let after = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "probe failed");
                return Verdict::NotStable;
            }
        };
        if before.len() != after.len() {
            debug!(
                path = %path.display(),
                before = before.len(),
                after = after.len(),
                "still growing"
            );
            return Verdict::NotStable;
        }

        if self.processed.insert(path) {
            Verdict::Forward
        } else {
            Verdict::Rejected(Rejection::AlreadyProcessed)
        }
    }
}

/// Editor swap files, Office lock files and other dotfiles.
fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .is_some_and(|name| name.starts_with('.') || name.starts_with("~$"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{fs, io::Write, thread};

    use tempfile::TempDir;

    const SETTLE: Duration = Duration::from_millis(100);

    fn filter() -> StabilityFilter {
        StabilityFilter::new(ProcessedFiles::new(), SETTLE)
    }

    #[tokio::test]
    async fn stable_file_is_forwarded_once() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.tif");
        fs::write(&file, "pixels").unwrap();
        let filter = filter();

        assert_eq!(filter.check(&file).await, Verdict::Forward);
        assert_eq!(
            filter.check(&file).await,
            Verdict::Rejected(Rejection::AlreadyProcessed)
        );
        assert!(filter.processed().contains(&file));
    }

    #[tokio::test]
    async fn overlapping_checks_forward_exactly_once() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.tif");
        fs::write(&file, "pixels").unwrap();
        let filter = filter();

        let (a, b) = tokio::join!(filter.check(&file), filter.check(&file));

        let forwarded = [a, b].iter().filter(|v| **v == Verdict::Forward).count();
        assert_eq!(forwarded, 1);
        assert_eq!(filter.processed().len(), 1);
    }

    #[tokio::test]
    async fn temp_files_are_rejected() {
        let dir = TempDir::new().unwrap();
        let filter = filter();

        for name in [".x.tif.swp", "~$report.docx"] {
            let file = dir.path().join(name);
            fs::write(&file, "tmp").unwrap();
            assert_eq!(
                filter.check(&file).await,
                Verdict::Rejected(Rejection::TempFile)
            );
        }
        assert!(filter.processed().is_empty());
    }

    #[tokio::test]
    async fn directories_are_rejected() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("EO");
        fs::create_dir(&sub).unwrap();

        assert_eq!(
            filter().check(&sub).await,
            Verdict::Rejected(Rejection::Directory)
        );
    }

    #[tokio::test]
    async fn vanished_file_is_not_forwarded() {
        let dir = TempDir::new().unwrap();
        let filter = filter();
        let missing = dir.path().join("gone.tif");

        assert_eq!(filter.check(&missing).await, Verdict::NotStable);
        assert!(filter.processed().is_empty());
    }

    #[tokio::test]
    async fn growing_file_waits_until_settled() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("z.ts");
        fs::write(&file, "").unwrap();

        let writer_path = file.clone();
        let writer = thread::spawn(move || {
            let mut f = fs::OpenOptions::new().append(true).open(writer_path).unwrap();
            for _ in 0..30 {
                f.write_all(b"frame").unwrap();
                f.flush().unwrap();
                thread::sleep(Duration::from_millis(20));
            }
        });

        let filter = filter();
        // The writer appends every 20ms, well inside the settle window.
        assert_eq!(filter.check(&file).await, Verdict::NotStable);
        assert!(!filter.processed().contains(&file));

        writer.join().unwrap();
        assert_eq!(filter.check(&file).await, Verdict::Forward);
    }

    #[test]
    fn in_flight_coalesces_events_while_settling() {
        let in_flight = InFlight::new();
        let path = Path::new("/m/videos/z.ts");

        assert!(in_flight.claim(path));
        assert!(!in_flight.claim(path));
        assert!(!in_flight.claim(path));
        assert_eq!(in_flight.len(), 1);

        // Events arrived, so an unstable result earns one more look.
        assert!(in_flight.finish(path, true));
        assert!(!in_flight.finish(path, true));
        assert!(in_flight.is_empty());

        assert!(in_flight.claim(path));
    }

    #[test]
    fn in_flight_releases_on_final_outcome() {
        let in_flight = InFlight::new();
        let path = Path::new("/m/videos/z.ts");

        in_flight.claim(path);
        in_flight.claim(path);

        assert!(!in_flight.finish(path, false));
        assert!(in_flight.is_empty());
    }

    #[test]
    fn temp_file_names() {
        assert!(is_temp_file(Path::new("/m/images/EO/.DS_Store")));
        assert!(is_temp_file(Path::new("/m/tactical/Detection/~$notes.docx")));
        assert!(!is_temp_file(Path::new("/m/images/EO/x.tif")));
        assert!(!is_temp_file(Path::new("/m/.hidden-dir/x.tif")));
    }
}
