//! Filesystem-backed blob store.
//!
//! Content lives once under `{root}/{aa}/{bb}/{content_hash}`; the path index
//! is kept in the `stored_files` table.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use smartmedia_common::{ContentHash, Error, PathHash, Result};
use smartmedia_db::pool::{get_conn, DbPool};
use smartmedia_db::queries::stored_files;

use super::{content_hash_of, normalize_path, path_hash_of, BlobStore, StoredFile};

/// Blob store keeping content on local disk.
pub struct FsBlobStore {
    root: PathBuf,
    pool: DbPool,
}

impl FsBlobStore {
    pub fn new(root: PathBuf, pool: DbPool) -> Self {
        Self { root, pool }
    }

    fn content_path(&self, content_hash: &ContentHash) -> PathBuf {
        let hash = content_hash.as_str();
        let (a, b) = (hash.get(0..2).unwrap_or("00"), hash.get(2..4).unwrap_or("00"));
        self.root.join(a).join(b).join(hash)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, path_hash: &PathHash) -> Result<Option<StoredFile>> {
        let conn = get_conn(&self.pool)?;
        stored_files::get_by_path_hash(&conn, path_hash)
    }

    async fn get_by_content_hash(&self, content_hash: &ContentHash) -> Result<Option<StoredFile>> {
        let conn = get_conn(&self.pool)?;
        stored_files::get_by_content_hash(&conn, content_hash)
    }

    async fn read(&self, file: &StoredFile) -> Result<Bytes> {
        let path = self.content_path(&file.content_hash);
        let data = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::not_found(format!("content {} at {}", file.content_hash, path.display()))
            }
            kind => Error::Io(std::io::Error::new(
                kind,
                format!("Failed to read {}: {}", path.display(), e),
            )),
        })?;
        Ok(Bytes::from(data))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<StoredFile> {
        let path = normalize_path(path)?;
        let content_hash = content_hash_of(&data);
        let content_path = self.content_path(&content_hash);

        if !tokio::fs::try_exists(&content_path).await? {
            if let Some(parent) = content_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            // Written beside the target and renamed into place.
            let partial = content_path.with_extension("partial");
            tokio::fs::write(&partial, &data).await?;
            tokio::fs::rename(&partial, &content_path).await?;
        }

        let file = StoredFile {
            path_hash: path_hash_of(&path),
            content_hash,
            path,
            size: data.len() as u64,
            created_at: Utc::now(),
        };

        let conn = get_conn(&self.pool)?;
        stored_files::upsert_stored_file(&conn, &file)?;

        tracing::debug!(path = %file.path, content_hash = %file.content_hash, "Stored file");
        Ok(file)
    }
}
