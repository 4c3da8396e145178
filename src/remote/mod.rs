//! Remote processing collaborators.
//!
//! Dispatch hands a source file to the remote pipeline through a
//! [`DispatchClient`]; result artifacts come back through an
//! [`ArtifactSource`]. Implementations report transport failures as
//! [`Error::RemoteDispatch`](smartmedia_common::Error::RemoteDispatch) and
//! [`Error::RemoteFetch`](smartmedia_common::Error::RemoteFetch) so batches
//! can keep them local to one record.

mod local;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use smartmedia_common::{ContentHash, Result, Service};
use smartmedia_db::models::ServiceStatuses;

pub use local::{LocalArtifactBucket, LocalDispatchBucket};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Settings attached to an uploaded object, telling the remote pipeline what to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// One `0`/`1` flag per optional service, in [`Service::OPTIONAL`] order.
    pub processes: String,
    /// Comma-separated transcode preset ids.
    pub presets: String,
    pub siteid: String,
}

impl DispatchSettings {
    /// Build the settings for a record about to be dispatched.
    ///
    /// A service is flagged on only while its status is still `Accepted`.
    pub fn for_record(services: &ServiceStatuses, preset_ids: &[String], site_id: &str) -> Self {
        Self {
            processes: process_flags(services),
            presets: preset_ids.join(","),
            siteid: site_id.to_string(),
        }
    }
}

/// Encode the optional services still awaiting dispatch as a flag string.
pub fn process_flags(services: &ServiceStatuses) -> String {
    Service::OPTIONAL
        .iter()
        .map(|s| {
            if services.get(*s) == smartmedia_common::ConversionStatus::Accepted {
                '1'
            } else {
                '0'
            }
        })
        .collect()
}

/// Sends source files to the remote pipeline.
#[async_trait]
pub trait DispatchClient: Send + Sync {
    /// Upload `data` keyed by its content hash, with the settings as object metadata.
    async fn upload(
        &self,
        content_hash: &ContentHash,
        data: Bytes,
        settings: &DispatchSettings,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

/// Where the remote pipeline leaves its result artifacts.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// List object keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Fetch one object.
    async fn get(&self, key: &str) -> Result<Bytes>;
}
