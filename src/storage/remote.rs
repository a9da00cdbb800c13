//! S3 sink.

use std::{fmt, io, path::Path};

use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
};

use super::{Result, UploadError};

/// Bucket and long-lived credentials for one account.
#[derive(Clone)]
pub struct RemoteSettings {
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

impl fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Writes objects into one bucket.
pub struct S3Sink {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Sink {
    pub fn new(settings: RemoteSettings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id,
            settings.secret_access_key,
            None,
            None,
            "uplink-config",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .build();

        Self {
            client: Client::from_conf(config),
            bucket: settings.bucket,
            region: settings.region,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn upload_file(&self, path: &Path, key: &str) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| UploadError::Read {
                path: path.to_path_buf(),
                source: io::Error::other(e),
            })?;
        self.put(key, body).await
    }

    pub async fn upload_empty_marker(&self, key: &str) -> Result<()> {
        self.put(key, ByteStream::from_static(b"")).await
    }

    async fn put(&self, key: &str, body: ByteStream) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Remote {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

impl fmt::Debug for S3Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Sink")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
