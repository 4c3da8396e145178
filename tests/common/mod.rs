//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, an on-disk blob
//! store in a temp directory, and stub remote collaborators. Orchestrators
//! built from one harness share all of them.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;

use smartmedia::conversion::{ConversionOrchestrator, OrchestratorSettings, ServiceSelection};
use smartmedia::remote::{ArtifactSource, DispatchClient, DispatchSettings};
use smartmedia::storage::{BlobStore, FsBlobStore, StoredFile};
use smartmedia_common::{ContentHash, Error, PathHash, Result, Service};
use smartmedia_db::models::{ConversionRecord, MediaMetadata, NewQueueMessage};
use smartmedia_db::pool::{init_memory_pool, DbPool, PooledConnection};
use smartmedia_db::queries::{conversions, media_metadata, queue_messages};

/// Dispatch stub recording every upload.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub uploads: Mutex<Vec<(ContentHash, DispatchSettings)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl DispatchClient for RecordingDispatcher {
    async fn upload(
        &self,
        content_hash: &ContentHash,
        _data: Bytes,
        settings: &DispatchSettings,
    ) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::remote_dispatch("input bucket unavailable"));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((content_hash.clone(), settings.clone()));
        Ok(())
    }
}

/// Artifact stub serving objects from memory.
#[derive(Default)]
pub struct StubArtifacts {
    objects: Mutex<BTreeMap<String, Bytes>>,
    broken: Mutex<HashSet<String>>,
    pub fetches: AtomicUsize,
}

impl StubArtifacts {
    pub fn add(&self, key: impl Into<String>, data: &'static [u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.into(), Bytes::from_static(data));
    }

    /// Make fetching `key` fail as if the bucket were unreachable.
    pub fn break_key(&self, key: impl Into<String>) {
        self.broken.lock().unwrap().insert(key.into());
    }
}

#[async_trait]
impl ArtifactSource for StubArtifacts {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.broken.lock().unwrap().contains(key) {
            return Err(Error::remote_fetch(format!("{} unavailable", key)));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::remote_fetch(format!("{} not found", key)))
    }
}

/// Blob store whose reads and writes fail as if the disk were unavailable.
pub struct OutageStore {
    pub inner: Arc<FsBlobStore>,
}

impl OutageStore {
    fn outage() -> Error {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "blob store unavailable",
        ))
    }
}

#[async_trait]
impl BlobStore for OutageStore {
    async fn get(&self, path_hash: &PathHash) -> Result<Option<StoredFile>> {
        self.inner.get(path_hash).await
    }

    async fn get_by_content_hash(&self, content_hash: &ContentHash) -> Result<Option<StoredFile>> {
        self.inner.get_by_content_hash(content_hash).await
    }

    async fn read(&self, _file: &StoredFile) -> Result<Bytes> {
        Err(Self::outage())
    }

    async fn put(&self, _path: &str, _data: Bytes) -> Result<StoredFile> {
        Err(Self::outage())
    }
}

pub struct TestHarness {
    pub db: DbPool,
    pub blobs: Arc<FsBlobStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub artifacts: Arc<StubArtifacts>,
    pub settings: OrchestratorSettings,
    next_message: AtomicUsize,
    _dir: TempDir,
}

impl TestHarness {
    /// Harness with transcoding, transcription and label detection enabled.
    pub fn new() -> Self {
        Self::with_settings(OrchestratorSettings {
            site_id: "test-site".to_string(),
            services: ServiceSelection::only([Service::Transcription, Service::LabelDetection]),
            preset_ids: vec!["preset-hd".to_string(), "preset-audio".to_string()],
            batch_size: 100,
        })
    }

    pub fn with_settings(settings: OrchestratorSettings) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let blobs = Arc::new(FsBlobStore::new(dir.path().join("files"), db.clone()));

        Self {
            db,
            blobs,
            dispatcher: Arc::new(RecordingDispatcher::default()),
            artifacts: Arc::new(StubArtifacts::default()),
            settings,
            next_message: AtomicUsize::new(1),
            _dir: dir,
        }
    }

    pub fn orchestrator(&self) -> ConversionOrchestrator {
        ConversionOrchestrator::new(
            self.db.clone(),
            self.settings.clone(),
            self.blobs.clone(),
            self.dispatcher.clone(),
            self.artifacts.clone(),
        )
    }

    /// Orchestrator sharing this harness's state but writing to a failing
    /// blob store.
    pub fn orchestrator_with_outage(&self) -> ConversionOrchestrator {
        ConversionOrchestrator::new(
            self.db.clone(),
            self.settings.clone(),
            Arc::new(OutageStore {
                inner: self.blobs.clone(),
            }),
            self.dispatcher.clone(),
            self.artifacts.clone(),
        )
    }

    pub fn conn(&self) -> PooledConnection {
        self.db.get().expect("failed to get connection")
    }

    pub async fn store_file(&self, path: &str, data: &'static [u8]) -> StoredFile {
        self.blobs
            .put(path, Bytes::from_static(data))
            .await
            .expect("failed to store file")
    }

    pub fn add_metadata(&self, file: &StoredFile, height: u32, duration_secs: f64) {
        media_metadata::upsert_metadata(
            &self.conn(),
            &MediaMetadata {
                path_hash: file.path_hash.clone(),
                content_hash: file.content_hash.clone(),
                height,
                duration_secs,
                video_streams: u32::from(height > 0),
                audio_streams: 1,
            },
        )
        .expect("failed to insert metadata");
    }

    /// Post a status message as the remote `service` would.
    pub fn post_message(&self, content_hash: &ContentHash, service: Service, status: &str) {
        let n = self.next_message.fetch_add(1, Ordering::SeqCst);
        queue_messages::insert_message(
            &self.conn(),
            &NewQueueMessage {
                message_id: format!("msg-{}", n),
                process: service.process_name().to_string(),
                status: status.to_string(),
                object_key: content_hash.clone(),
                body: None,
            },
        )
        .expect("failed to insert message");
    }

    /// Delete a file's content from disk, leaving its index entry behind.
    pub fn remove_content(&self, file: &StoredFile) {
        let hash = file.content_hash.as_str();
        let path = self
            ._dir
            .path()
            .join("files")
            .join(&hash[0..2])
            .join(&hash[2..4])
            .join(hash);
        std::fs::remove_file(path).expect("failed to remove content");
    }

    pub fn record(&self, path_hash: &PathHash) -> ConversionRecord {
        conversions::find_by_path_hash(&self.conn(), path_hash)
            .unwrap()
            .expect("conversion record missing")
    }

    /// Store a file, create its conversion and dispatch it.
    pub async fn dispatched_file(&self, path: &str, data: &'static [u8]) -> StoredFile {
        let file = self.store_file(path, data).await;
        let orchestrator = self.orchestrator();
        orchestrator.create_conversion(&file).unwrap();
        orchestrator.dispatch().await.unwrap();
        file
    }
}

/// Check the aggregate status against the per-service statuses.
pub fn assert_consistent(record: &ConversionRecord) {
    use smartmedia_common::ConversionStatus;

    let statuses: Vec<_> = record.services.iter().map(|(_, s)| s).collect();
    match record.status {
        ConversionStatus::Finished => {
            assert!(statuses.iter().all(|s| s.is_complete()), "{:?}", record);
            assert!(record.completed_at.is_some());
        }
        ConversionStatus::Error => {
            assert!(
                statuses.iter().any(|s| *s == ConversionStatus::Error),
                "{:?}",
                record
            );
            assert!(record.completed_at.is_some());
        }
        _ => assert!(record.completed_at.is_none()),
    }
}
