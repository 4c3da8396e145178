//! Blob store for source files and retrieved result artifacts.
//!
//! Files are addressed by path for retrieval and by content for
//! deduplication. [`FsBlobStore`] is the on-disk implementation.

mod fs;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use smartmedia_common::{ContentHash, Error, PathHash, Result};
pub use smartmedia_db::models::StoredFile;

pub use fs::FsBlobStore;

/// Storage the conversion batches read source files from and write artifacts to.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Look a file up by the hash of its path.
    async fn get(&self, path_hash: &PathHash) -> Result<Option<StoredFile>>;

    /// Look up any file holding the given content.
    async fn get_by_content_hash(&self, content_hash: &ContentHash) -> Result<Option<StoredFile>>;

    /// Read a file's bytes.
    ///
    /// Returns [`Error::NotFound`] when the index entry exists but its
    /// content is gone.
    async fn read(&self, file: &StoredFile) -> Result<Bytes>;

    /// Store `data` at `path`, replacing whatever was stored there.
    async fn put(&self, path: &str, data: Bytes) -> Result<StoredFile>;
}

/// Normalize a store path to `/a/b/c` form.
///
/// Rejects empty paths and `.`/`..` segments.
pub fn normalize_path(path: &str) -> Result<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(Error::invalid_input("Empty store path"));
    }
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(Error::invalid_input(format!("Invalid store path: {}", path)));
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Hex SHA-256 of a normalized store path.
pub fn path_hash_of(normalized_path: &str) -> PathHash {
    PathHash::new(hex::encode(Sha256::digest(normalized_path.as_bytes())))
}

/// Hex SHA-256 of file content.
pub fn content_hash_of(data: &[u8]) -> ContentHash {
    ContentHash::new(hex::encode(Sha256::digest(data)))
}
