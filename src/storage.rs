//! Upload sinks: where classified files end up.
//!
//! Two interchangeable destinations sit behind one [`Sink`]:
//!
//! - `Remote`: an S3 bucket, written with the account's static credentials.
//! - `Local`: a mirror directory, with `/` in keys treated as path separators.
//!
//! The variant is chosen once at startup from the selected account.

mod local;
mod remote;

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

pub use local::LocalSink;
pub use remote::{RemoteSettings, S3Sink};

/// Default mirror directory name for local storage, under the storage root.
pub const LOCAL_STORE_DIR: &str = "uploads";

/// Errors from a single upload. The pipeline logs them and carries on.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {key} to {}: {source}", dest.display())]
    Write {
        key: String,
        dest: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("object key '{0}' cannot be mapped into the local store")]
    InvalidKey(String),

    #[error("failed to put s3://{bucket}/{key}: {message}")]
    Remote {
        bucket: String,
        key: String,
        message: String,
    },
}

pub type Result<T> = core::result::Result<T, UploadError>;

/// An account's resolved destination, before any client is built.
#[derive(Debug, Clone)]
pub enum Target {
    Remote(RemoteSettings),
    Local { path: Option<PathBuf> },
}

/// The upload destination for this run.
#[derive(Debug)]
pub enum Sink {
    Remote(S3Sink),
    Local(LocalSink),
}

impl Sink {
    /// Builds the sink for a target. Local mirrors default to `<root>/uploads`.
    pub fn open(target: Target, root: &Path) -> io::Result<Self> {
        match target {
            Target::Remote(settings) => Ok(Self::Remote(S3Sink::new(settings))),
            Target::Local { path } => {
                let path = path.unwrap_or_else(|| root.join(LOCAL_STORE_DIR));
                Ok(Self::Local(LocalSink::new(path)?))
            }
        }
    }

    /// Uploads the file at `path` under `key`.
    pub async fn upload_file(&self, path: &Path, key: &str) -> Result<()> {
        match self {
            Self::Remote(s3) => s3.upload_file(path, key).await,
            Self::Local(local) => local.upload_file(path, key).await,
        }
    }

    /// Puts a zero-byte object at `key`.
    pub async fn upload_empty_marker(&self, key: &str) -> Result<()> {
        match self {
            Self::Remote(s3) => s3.upload_empty_marker(key).await,
            Self::Local(local) => local.upload_empty_marker(key).await,
        }
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(s3) => write!(f, "s3://{}", s3.bucket()),
            Self::Local(local) => write!(f, "{}", local.root().display()),
        }
    }
}
