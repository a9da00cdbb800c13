//! The upload pipeline: watcher → stability filter → classifier → key → sink.
//!
//! Each path that survives the cheap screening gets one task at a time;
//! events for a path whose probe is still pending are folded into a re-check.
//! Within a task the probe, classification, key derivation and upload run in
//! order.
//! Tasks for different files run concurrently and finish in any order.
//! Nothing a single file does can stop the loop.

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::{
    classify::{ClassifyError, classify},
    key::{file_extension, mission_marker_key, object_key},
    model::Mission,
    stability::{InFlight, Rejection, StabilityFilter, Verdict},
    storage::{Sink, UploadError},
    watch::Watcher,
};

/// What happened to one event.
#[derive(Debug)]
pub enum Outcome {
    Uploaded { key: String },
    Rejected(Rejection),
    NotStable,
    Unclassified(ClassifyError),
    Failed { key: String, error: UploadError },
}

pub struct Pipeline {
    mission: Mission,
    mission_root: PathBuf,
    prefix: Option<String>,
    sink: Sink,
    filter: StabilityFilter,
    in_flight: InFlight,
}

impl Pipeline {
    pub fn new(
        mission: Mission,
        mission_root: PathBuf,
        prefix: Option<String>,
        sink: Sink,
        filter: StabilityFilter,
    ) -> Self {
        Self {
            mission,
            mission_root,
            prefix,
            sink,
            filter,
            in_flight: InFlight::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Uploads the empty mission marker and returns its key.
    pub async fn announce(&self) -> Result<String, UploadError> {
        let key = mission_marker_key(&self.mission, self.prefix.as_deref());
        self.sink.upload_empty_marker(&key).await?;
        info!(
            key = %key,
            destination = %self.sink,
            mission = self.mission.name(),
            "created mission"
        );
        Ok(key)
    }

    /// Runs one path through the whole pipeline.
    pub async fn handle(&self, path: &Path) -> Outcome {
        match self.filter.check(path).await {
            Verdict::Forward => {}
            Verdict::Rejected(rejection) => {
                debug!(path = %path.display(), ?rejection, "skipped");
                return Outcome::Rejected(rejection);
            }
            Verdict::NotStable => return Outcome::NotStable,
        }

        let product = match classify(path, &self.mission_root) {
            Ok(product) => product,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unrecognized file");
                return Outcome::Unclassified(e);
            }
        };

        let key = object_key(
            self.mission.name(),
            &product,
            &file_extension(path),
            self.prefix.as_deref(),
        );
        let name = display_name(path);

        info!(file = %name, %product, "uploading");
        match self.sink.upload_file(path, &key).await {
            Ok(()) => {
                info!(file = %name, key = %key, destination = %self.sink, "uploaded");
                Outcome::Uploaded { key }
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    key = %key,
                    destination = %self.sink,
                    error = %e,
                    "upload failed; file left in place"
                );
                Outcome::Failed { key, error: e }
            }
        }
    }

    /// Handles a path claimed in [`InFlight`], probing again while events keep
    /// arriving for an unstable file, then releases the claim.
    pub async fn handle_claimed(&self, path: &Path) -> Outcome {
        loop {
            let outcome = self.handle(path).await;
            let unstable = matches!(outcome, Outcome::NotStable);
            if !self.in_flight.finish(path, unstable) {
                return outcome;
            }
            debug!(path = %path.display(), "changed while settling, checking again");
        }
    }

    /// Feeds watcher events through the pipeline until `shutdown` resolves.
    ///
    /// On shutdown the watcher is dropped first, then in-flight uploads are
    /// awaited; none are aborted.
    pub async fn run(self: Arc<Self>, mut watcher: Watcher, shutdown: impl Future<Output = ()>) {
        let tracker = TaskTracker::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                event = watcher.next() => {
                    let Some(event) = event else {
                        warn!("watcher stopped");
                        break;
                    };
                    if let Some(rejection) = self.filter.screen(&event.path) {
                        debug!(path = %event.path.display(), ?rejection, "skipped");
                        continue;
                    }
                    if !self.in_flight.claim(&event.path) {
                        continue;
                    }
                    let pipeline = Arc::clone(&self);
                    tracker.spawn(async move {
                        pipeline.handle_claimed(&event.path).await;
                    });
                }
            }
        }

        drop(watcher);
        tracker.close();
        if !tracker.is_empty() {
            info!(pending = tracker.len(), "waiting for in-flight uploads");
        }
        tracker.wait().await;
        info!(processed = self.filter.processed().len(), "stopped watching");
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
