//! Directory-backed stand-ins for the remote input and output buckets.
//!
//! `LocalDispatchBucket` drops uploads into an input directory as
//! `{content_hash}` plus a `{content_hash}.json` settings sidecar.
//! `LocalArtifactBucket` serves keys as paths relative to an output directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use smartmedia_common::{ContentHash, Error, Result};

use super::{ArtifactSource, DispatchClient, DispatchSettings};

/// Input bucket on local disk.
pub struct LocalDispatchBucket {
    dir: PathBuf,
}

impl LocalDispatchBucket {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DispatchClient for LocalDispatchBucket {
    async fn upload(
        &self,
        content_hash: &ContentHash,
        data: Bytes,
        settings: &DispatchSettings,
    ) -> Result<()> {
        let sidecar = serde_json::to_vec_pretty(settings)
            .map_err(|e| Error::internal(format!("Failed to encode dispatch settings: {}", e)))?;

        let object = self.dir.join(content_hash.as_str());
        let write = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&object, &data).await?;
            tokio::fs::write(object.with_extension("json"), sidecar).await
        };
        write.await.map_err(|e| {
            Error::remote_dispatch(format!("Upload of {} failed: {}", content_hash, e))
        })?;

        tracing::debug!(%content_hash, bytes = data.len(), "Uploaded object to input bucket");
        Ok(())
    }
}

/// Output bucket on local disk.
pub struct LocalArtifactBucket {
    dir: PathBuf,
}

impl LocalArtifactBucket {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return Err(Error::remote_fetch(format!("Invalid object key: {}", key)));
        }
        Ok(self.dir.join(relative))
    }
}

#[async_trait]
impl ArtifactSource for LocalArtifactBucket {
    /// Objects directly under the prefix's directory whose key starts with the prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let (dir_key, _) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        let dir = if dir_key.is_empty() {
            self.dir.clone()
        } else {
            self.resolve(dir_key)?
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::remote_fetch(format!("Listing {} failed: {}", prefix, e))),
        };

        let mut keys = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|e| Error::remote_fetch(format!("Listing {} failed: {}", prefix, e)))?;
            let Some(entry) = entry else { break };

            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let key = if dir_key.is_empty() {
                name
            } else {
                format!("{}/{}", dir_key, name)
            };
            if is_file && key.starts_with(prefix) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.resolve(key)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::remote_fetch(format!("Fetch of {} failed: {}", key, e)))?;
        Ok(Bytes::from(data))
    }
}
