//! Local mirror sink, used when an account has no remote storage.
//!
//! ```text
//! <root>/IMAGERY/20240801_193007Z_Crawl1_EOimage.tif
//! <root>/MISSION/Crawl1_20240801_1930Z.txt
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use super::{Result, UploadError};

#[derive(Debug)]
pub struct LocalSink {
    root: PathBuf,
}

impl LocalSink {
    /// Creates a sink rooted at the given directory, creating it if missing.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies `path` to the location `key` maps to.
    pub async fn upload_file(&self, path: &Path, key: &str) -> Result<()> {
        tokio::fs::metadata(path)
            .await
            .map_err(|source| UploadError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let dest = self.prepare(key).await?;
        tokio::fs::copy(path, &dest)
            .await
            .map_err(|source| UploadError::Write {
                key: key.to_string(),
                dest,
                source,
            })?;
        Ok(())
    }

    pub async fn upload_empty_marker(&self, key: &str) -> Result<()> {
        let dest = self.prepare(key).await?;
        tokio::fs::write(&dest, b"")
            .await
            .map_err(|source| UploadError::Write {
                key: key.to_string(),
                dest,
                source,
            })
    }

    /// Maps the key to a path and creates its parent directories.
    async fn prepare(&self, key: &str) -> Result<PathBuf> {
        let dest = self.path_for(key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| UploadError::Write {
                    key: key.to_string(),
                    dest: parent.to_path_buf(),
                    source,
                })?;
        }
        Ok(dest)
    }

    /// Maps a key onto the mirror, refusing segments that would leave it.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut dest = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains('\\')
                || Path::new(segment).is_absolute()
            {
                return Err(UploadError::InvalidKey(key.to_string()));
            }
            dest.push(segment);
        }
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn sink(dir: &TempDir) -> LocalSink {
        LocalSink::new(dir.path().join("store")).unwrap()
    }

    #[tokio::test]
    async fn key_segments_become_directories() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.ts");
        fs::write(&source, "frames").unwrap();

        let sink = sink(&dir);
        sink.upload_file(&source, "acme/VIDEO/20240801_193007Z_Crawl1_Video.ts")
            .await
            .unwrap();

        let dest = dir
            .path()
            .join("store/acme/VIDEO/20240801_193007Z_Crawl1_Video.ts");
        assert_eq!(fs::read_to_string(dest).unwrap(), "frames");
        // The source stays put for manual retry.
        assert!(source.is_file());
    }

    #[tokio::test]
    async fn marker_is_empty_file() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        sink.upload_empty_marker("MISSION/Crawl1_20240801_1930Z.txt")
            .await
            .unwrap();

        let marker = dir.path().join("store/MISSION/Crawl1_20240801_1930Z.txt");
        assert_eq!(fs::metadata(marker).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        for key in ["../outside.txt", "a//b.txt", "/abs.txt", "a/./b.txt", "a\\b.txt"] {
            let err = sink.upload_empty_marker(key).await.unwrap_err();
            assert!(matches!(err, UploadError::InvalidKey(_)), "{key}");
        }
        assert!(!dir.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn missing_source_is_read_error() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        let err = sink
            .upload_file(&dir.path().join("gone.tif"), "IMAGERY/x.tif")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
        assert!(!dir.path().join("store/IMAGERY").exists());
    }
}
