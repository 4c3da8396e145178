//! Batch operations driving conversion records through their lifecycle.
//!
//! Each batch loads a bounded set of candidate records, works on them one at
//! a time and reports a [`RecordOutcome`] per record. A remote failure stays
//! local to its record; storage failures abort the batch.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use smartmedia_common::{
    ContentHash, ConversionStatus, Error, PathHash, RemoteOutcome, Result, Service,
};
use smartmedia_db::models::{ConversionRecord, ServiceStatuses};
use smartmedia_db::pool::{get_conn, DbPool};
use smartmedia_db::queries::{conversions, media_metadata, presets, queue_messages};

use super::report::{BatchReport, CycleReport, RecordOutcome};
use super::settings::OrchestratorSettings;
use super::state::{self, Applied};
use crate::remote::{ArtifactSource, DispatchClient, DispatchSettings};
use crate::storage::{BlobStore, StoredFile};

/// Drives conversions from creation through dispatch to retrieved results.
pub struct ConversionOrchestrator {
    pool: DbPool,
    settings: OrchestratorSettings,
    blobs: Arc<dyn BlobStore>,
    dispatcher: Arc<dyn DispatchClient>,
    artifacts: Arc<dyn ArtifactSource>,
}

impl ConversionOrchestrator {
    pub fn new(
        pool: DbPool,
        settings: OrchestratorSettings,
        blobs: Arc<dyn BlobStore>,
        dispatcher: Arc<dyn DispatchClient>,
        artifacts: Arc<dyn ArtifactSource>,
    ) -> Self {
        Self {
            pool,
            settings,
            blobs,
            dispatcher,
            artifacts,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Create the conversion record for a stored file.
    ///
    /// Creating a record for a file (or content) that already has one is a
    /// no-op reported as [`RecordOutcome::AlreadyExists`].
    pub fn create_conversion(&self, file: &StoredFile) -> Result<RecordOutcome> {
        let services = ServiceStatuses::seeded(|s| self.settings.services.is_enabled(s));
        let conn = get_conn(&self.pool)?;

        match conversions::create_conversion(
            &conn,
            &file.path_hash,
            &file.content_hash,
            &services,
            &self.settings.preset_ids,
        ) {
            Ok(record) => {
                tracing::info!(
                    "Created conversion {} for {} ({})",
                    record.id,
                    file.path,
                    record.content_hash
                );
                Ok(RecordOutcome::Created)
            }
            Err(Error::Duplicate(msg)) => {
                tracing::debug!("Conversion already exists for {}: {}", file.path, msg);
                Ok(RecordOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    /// Aggregate status of the conversion for a stored file, if it has one.
    pub fn conversion_status(&self, path_hash: &PathHash) -> Result<Option<ConversionStatus>> {
        let conn = get_conn(&self.pool)?;
        conversions::status_for_path_hash(&conn, path_hash)
    }

    /// Look up a file's conversion status, creating the conversion first when
    /// `trigger` is set and none exists.
    ///
    /// Returns `None` when there is still no conversion afterwards, including
    /// when the stored file itself is unknown.
    pub async fn request_conversion(
        &self,
        path_hash: &PathHash,
        trigger: bool,
    ) -> Result<Option<ConversionStatus>> {
        if let Some(status) = self.conversion_status(path_hash)? {
            return Ok(Some(status));
        }
        if !trigger {
            return Ok(None);
        }

        match self.blobs.get(path_hash).await? {
            Some(file) => {
                self.create_conversion(&file)?;
                self.conversion_status(path_hash)
            }
            None => {
                tracing::warn!("Cannot convert {}: stored file not found", path_hash);
                Ok(None)
            }
        }
    }

    /// Create conversions for files with extracted metadata but no record yet.
    pub async fn backfill(&self) -> Result<BatchReport> {
        let candidates = {
            let conn = get_conn(&self.pool)?;
            media_metadata::list_without_conversion(&conn, self.settings.batch_size)?
        };

        let mut report = BatchReport::new();
        for metadata in candidates {
            let outcome = match self.blobs.get(&metadata.path_hash).await? {
                Some(file) => self.create_conversion(&file)?,
                None => {
                    tracing::warn!(
                        "Skipping backfill of {}: stored file not found",
                        metadata.path_hash
                    );
                    RecordOutcome::FileMissing
                }
            };
            report.record(metadata.path_hash, outcome);
        }

        tracing::info!("Backfill finished: {:?}", report.summary());
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Send accepted conversions to the remote pipeline.
    pub async fn dispatch(&self) -> Result<BatchReport> {
        let candidates = {
            let conn = get_conn(&self.pool)?;
            conversions::list_by_status(&conn, ConversionStatus::Accepted, self.settings.batch_size)?
        };

        let mut report = BatchReport::new();
        for record in candidates {
            let path_hash = record.path_hash.clone();
            let outcome = self.dispatch_record(record).await?;
            report.record(path_hash, outcome);
        }

        tracing::info!("Dispatch finished: {:?}", report.summary());
        Ok(report)
    }

    async fn dispatch_record(&self, mut record: ConversionRecord) -> Result<RecordOutcome> {
        let preset_ids = {
            let conn = get_conn(&self.pool)?;
            presets::list_presets(&conn, record.id)?
        };
        let settings =
            DispatchSettings::for_record(&record.services, &preset_ids, &self.settings.site_id);

        let outcome = match self.upload(&record, &settings).await {
            Ok(()) => {
                state::mark_dispatched(&mut record);
                tracing::info!("Dispatched conversion {} ({})", record.id, record.content_hash);
                RecordOutcome::Dispatched
            }
            Err(e) if e.is_remote() => {
                state::mark_dispatch_failed(&mut record, Utc::now());
                tracing::warn!("Dispatch of conversion {} failed: {}", record.id, e);
                RecordOutcome::DispatchFailed {
                    reason: e.to_string(),
                }
            }
            Err(e) => return Err(e),
        };

        let conn = get_conn(&self.pool)?;
        if !conversions::save_statuses(&conn, &record, ConversionStatus::Accepted)? {
            tracing::debug!("Conversion {} was dispatched elsewhere", record.id);
            return Ok(RecordOutcome::LostUpdate);
        }
        Ok(outcome)
    }

    async fn upload(&self, record: &ConversionRecord, settings: &DispatchSettings) -> Result<()> {
        let file = self.blobs.get(&record.path_hash).await?.ok_or_else(|| {
            Error::remote_dispatch(format!("Stored file {} not found", record.path_hash))
        })?;
        let data = match self.blobs.read(&file).await {
            Err(Error::NotFound(msg)) => {
                return Err(Error::remote_dispatch(format!("Stored file missing: {}", msg)))
            }
            result => result?,
        };
        self.dispatcher
            .upload(&record.content_hash, data, settings)
            .await
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// Apply pending remote status messages to in-progress conversions and
    /// retrieve the artifacts of finished services.
    pub async fn reconcile(&self) -> Result<BatchReport> {
        let candidates = {
            let conn = get_conn(&self.pool)?;
            conversions::list_by_status(
                &conn,
                ConversionStatus::InProgress,
                self.settings.batch_size,
            )?
        };

        let mut report = BatchReport::new();
        for record in candidates {
            let path_hash = record.path_hash.clone();
            let outcome = self.reconcile_record(record).await?;
            report.record(path_hash, outcome);
        }

        tracing::info!("Reconcile finished: {:?}", report.summary());
        Ok(report)
    }

    async fn reconcile_record(&self, mut record: ConversionRecord) -> Result<RecordOutcome> {
        let messages = {
            let conn = get_conn(&self.pool)?;
            queue_messages::list_pending(
                &conn,
                &record.content_hash,
                &record.services.open_services(),
            )?
        };

        let mut applied = Vec::new();
        for message in &messages {
            let (Some(service), Some(outcome)) = (
                Service::from_process_name(&message.process),
                RemoteOutcome::from_message_status(&message.status),
            ) else {
                continue;
            };

            applied.push(message.id);
            // A repeat message for a service this batch already settled.
            if !record.services.get(service).is_open() {
                continue;
            }

            let retrieved = match outcome {
                RemoteOutcome::Failed => false,
                RemoteOutcome::Succeeded => self.retrieve(&record.content_hash, service).await?,
            };
            let now = Utc::now();
            if state::apply_outcome(&mut record, service, outcome, retrieved, now) == Applied::Stop {
                tracing::warn!(
                    "Transcoding failed for conversion {}; abandoning remaining services",
                    record.id
                );
                break;
            }
        }

        let settled = state::settle(&mut record, Utc::now());
        if applied.is_empty() && !settled {
            return Ok(RecordOutcome::Reconciled {
                status: record.status,
                applied: 0,
            });
        }

        let conn = get_conn(&self.pool)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;
        if !conversions::save_statuses(&tx, &record, ConversionStatus::InProgress)? {
            tracing::debug!("Conversion {} was reconciled elsewhere", record.id);
            return Ok(RecordOutcome::LostUpdate);
        }
        queue_messages::mark_processed(&tx, &applied)?;
        tx.commit().map_err(|e| Error::database(e.to_string()))?;

        if record.status.is_terminal() {
            tracing::info!("Conversion {} completed: {}", record.id, record.status);
        }
        Ok(RecordOutcome::Reconciled {
            status: record.status,
            applied: applied.len(),
        })
    }

    /// Copy a finished service's artifacts into the blob store.
    ///
    /// Returns `false` when the remote side could not supply them.
    async fn retrieve(&self, content_hash: &ContentHash, service: Service) -> Result<bool> {
        let result = match service.artifact_name() {
            None => self.retrieve_transcodes(content_hash).await,
            Some(name) => {
                self.retrieve_artifact(&format!("{}/metadata/{}.json", content_hash, name))
                    .await
            }
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_remote() => {
                tracing::warn!("Retrieving {} results for {} failed: {}", service, content_hash, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn retrieve_transcodes(&self, content_hash: &ContentHash) -> Result<()> {
        let keys = self
            .artifacts
            .list(&format!("{}/conversions/", content_hash))
            .await?;
        for key in &keys {
            self.retrieve_artifact(key).await?;
        }
        tracing::debug!("Retrieved {} transcodes for {}", keys.len(), content_hash);
        Ok(())
    }

    async fn retrieve_artifact(&self, key: &str) -> Result<()> {
        let data: Bytes = self.artifacts.get(key).await?;
        self.blobs.put(&format!("/{}", key), data).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cycle
    // -----------------------------------------------------------------------

    /// Run backfill, dispatch and reconcile once, in that order.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        Ok(CycleReport {
            backfill: self.backfill().await?,
            dispatch: self.dispatch().await?,
            reconcile: self.reconcile().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ServiceSelection;
    use crate::storage::FsBlobStore;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use smartmedia_db::models::NewQueueMessage;
    use smartmedia_db::pool::{init_memory_pool, PooledConnection};

    fn post(conn: &PooledConnection, content_hash: &ContentHash, service: Service, status: &str) {
        queue_messages::insert_message(
            conn,
            &NewQueueMessage {
                message_id: format!("{}-{}", service.process_name(), status),
                process: service.process_name().to_string(),
                status: status.to_string(),
                object_key: content_hash.clone(),
                body: None,
            },
        )
        .unwrap();
    }

    struct FailingDispatch;

    #[async_trait]
    impl DispatchClient for FailingDispatch {
        async fn upload(&self, _: &ContentHash, _: Bytes, _: &DispatchSettings) -> Result<()> {
            Err(Error::remote_dispatch("bucket unavailable"))
        }
    }

    struct NoArtifacts;

    #[async_trait]
    impl ArtifactSource for NoArtifacts {
        async fn list(&self, _: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn get(&self, key: &str) -> Result<Bytes> {
            Err(Error::remote_fetch(format!("{} missing", key)))
        }
    }

    struct ServeAll;

    #[async_trait]
    impl ArtifactSource for ServeAll {
        async fn list(&self, _: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn get(&self, _: &str) -> Result<Bytes> {
            Ok(Bytes::from_static(b"{}"))
        }
    }

    fn orchestrator(dir: &std::path::Path) -> (ConversionOrchestrator, Arc<FsBlobStore>) {
        orchestrator_with(dir, Arc::new(NoArtifacts))
    }

    fn orchestrator_with(
        dir: &std::path::Path,
        artifacts: Arc<dyn ArtifactSource>,
    ) -> (ConversionOrchestrator, Arc<FsBlobStore>) {
        let pool = init_memory_pool().unwrap();
        let blobs = Arc::new(FsBlobStore::new(dir.to_path_buf(), pool.clone()));
        let settings = OrchestratorSettings {
            site_id: "test".into(),
            services: ServiceSelection::only([Service::LabelDetection]),
            preset_ids: vec!["preset-hd".into()],
            batch_size: 10,
        };
        let orchestrator = ConversionOrchestrator::new(
            pool,
            settings,
            blobs.clone(),
            Arc::new(FailingDispatch),
            artifacts,
        );
        (orchestrator, blobs)
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, blobs) = orchestrator(dir.path());
        let file = blobs.put("/a.mp4", Bytes::from_static(b"a")).await.unwrap();

        assert_eq!(orchestrator.create_conversion(&file).unwrap(), RecordOutcome::Created);
        assert_eq!(
            orchestrator.create_conversion(&file).unwrap(),
            RecordOutcome::AlreadyExists
        );
        assert_eq!(
            orchestrator.conversion_status(&file.path_hash).unwrap(),
            Some(ConversionStatus::Accepted)
        );
    }

    #[tokio::test]
    async fn test_request_conversion_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, blobs) = orchestrator(dir.path());
        let file = blobs.put("/b.mp4", Bytes::from_static(b"b")).await.unwrap();

        assert_eq!(orchestrator.request_conversion(&file.path_hash, false).await.unwrap(), None);
        assert_eq!(
            orchestrator.request_conversion(&file.path_hash, true).await.unwrap(),
            Some(ConversionStatus::Accepted)
        );
        assert_eq!(
            orchestrator
                .request_conversion(&PathHash::new("unknown"), true)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_dispatch_failure_marks_error() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, blobs) = orchestrator(dir.path());
        let file = blobs.put("/c.mp4", Bytes::from_static(b"c")).await.unwrap();
        orchestrator.create_conversion(&file).unwrap();

        let report = orchestrator.dispatch().await.unwrap();

        assert_matches!(
            report.get(&file.path_hash),
            Some(RecordOutcome::DispatchFailed { reason }) if reason.contains("bucket unavailable")
        );
        assert_eq!(
            orchestrator.conversion_status(&file.path_hash).unwrap(),
            Some(ConversionStatus::Error)
        );
        // Nothing left to dispatch.
        assert!(orchestrator.dispatch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_reconcile_loses_and_reconverges() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, blobs) = orchestrator_with(dir.path(), Arc::new(ServeAll));
        let file = blobs.put("/d.mp4", Bytes::from_static(b"d")).await.unwrap();
        orchestrator.create_conversion(&file).unwrap();

        let conn = get_conn(&orchestrator.pool).unwrap();
        let mut record = conversions::find_by_path_hash(&conn, &file.path_hash).unwrap().unwrap();
        state::mark_dispatched(&mut record);
        assert!(conversions::save_statuses(&conn, &record, ConversionStatus::Accepted).unwrap());

        // A second process reads the record, then stalls.
        let stale = conversions::find_by_path_hash(&conn, &file.path_hash).unwrap().unwrap();

        post(&conn, &file.content_hash, Service::LabelDetection, "SUCCEEDED");
        orchestrator.reconcile().await.unwrap();
        let record = conversions::find_by_path_hash(&conn, &file.path_hash).unwrap().unwrap();
        assert_eq!(record.services.label_detection, ConversionStatus::Finished);

        post(&conn, &file.content_hash, Service::Transcoding, "COMPLETED");
        let outcome = orchestrator.reconcile_record(stale).await.unwrap();
        assert_eq!(outcome, RecordOutcome::LostUpdate);

        let record = conversions::find_by_path_hash(&conn, &file.path_hash).unwrap().unwrap();
        assert_eq!(record.services.label_detection, ConversionStatus::Finished);
        assert_eq!(record.services.transcoding, ConversionStatus::InProgress);
        let pending =
            queue_messages::list_pending(&conn, &file.content_hash, &[Service::Transcoding])
                .unwrap();
        assert_eq!(pending.len(), 1);

        orchestrator.reconcile().await.unwrap();
        let record = conversions::find_by_path_hash(&conn, &file.path_hash).unwrap().unwrap();
        assert_eq!(record.status, ConversionStatus::Finished);
        assert_eq!(record.services.label_detection, ConversionStatus::Finished);
    }
}
