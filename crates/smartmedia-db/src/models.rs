//! Internal Rust models matching the database schema.
//!
//! This module provides strongly-typed Rust structures that map to database tables.
//! All models use types from smartmedia-common where appropriate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartmedia_common::{ContentHash, ConversionId, ConversionStatus, PathHash, Service};

/// Status of every tracked service for one conversion.
///
/// One named field per service; [`ServiceStatuses::get`] and
/// [`ServiceStatuses::set`] map a [`Service`] onto its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatuses {
    pub transcoding: ConversionStatus,
    pub transcription: ConversionStatus,
    pub label_detection: ConversionStatus,
    pub moderation_detection: ConversionStatus,
    pub face_detection: ConversionStatus,
    pub person_tracking: ConversionStatus,
    pub sentiment_detection: ConversionStatus,
    pub phrase_detection: ConversionStatus,
    pub entity_detection: ConversionStatus,
}

impl ServiceStatuses {
    /// Seed statuses for a new conversion: ACCEPTED when enabled, otherwise
    /// NOT_APPLICABLE.
    pub fn seeded(enabled: impl Fn(Service) -> bool) -> Self {
        let mut statuses = Self::uniform(ConversionStatus::NotApplicable);
        for service in Service::ALL {
            if enabled(service) {
                statuses.set(service, ConversionStatus::Accepted);
            }
        }
        statuses
    }

    /// Every service set to the same status.
    pub fn uniform(status: ConversionStatus) -> Self {
        Self {
            transcoding: status,
            transcription: status,
            label_detection: status,
            moderation_detection: status,
            face_detection: status,
            person_tracking: status,
            sentiment_detection: status,
            phrase_detection: status,
            entity_detection: status,
        }
    }

    pub fn get(&self, service: Service) -> ConversionStatus {
        match service {
            Service::Transcoding => self.transcoding,
            Service::Transcription => self.transcription,
            Service::LabelDetection => self.label_detection,
            Service::ModerationDetection => self.moderation_detection,
            Service::FaceDetection => self.face_detection,
            Service::PersonTracking => self.person_tracking,
            Service::SentimentDetection => self.sentiment_detection,
            Service::PhraseDetection => self.phrase_detection,
            Service::EntityDetection => self.entity_detection,
        }
    }

    pub fn set(&mut self, service: Service, status: ConversionStatus) {
        let field = match service {
            Service::Transcoding => &mut self.transcoding,
            Service::Transcription => &mut self.transcription,
            Service::LabelDetection => &mut self.label_detection,
            Service::ModerationDetection => &mut self.moderation_detection,
            Service::FaceDetection => &mut self.face_detection,
            Service::PersonTracking => &mut self.person_tracking,
            Service::SentimentDetection => &mut self.sentiment_detection,
            Service::PhraseDetection => &mut self.phrase_detection,
            Service::EntityDetection => &mut self.entity_detection,
        };
        *field = status;
    }

    /// Iterate `(service, status)` pairs, transcoding first.
    pub fn iter(&self) -> impl Iterator<Item = (Service, ConversionStatus)> + '_ {
        Service::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    /// Services still waiting on a remote result.
    pub fn open_services(&self) -> Vec<Service> {
        self.iter()
            .filter(|(_, status)| status.is_open())
            .map(|(service, _)| service)
            .collect()
    }
}

/// Column holding a service's status in the `conversions` table.
pub fn status_column(service: Service) -> &'static str {
    match service {
        Service::Transcoding => "transcoding_status",
        Service::Transcription => "transcription_status",
        Service::LabelDetection => "label_detection_status",
        Service::ModerationDetection => "moderation_detection_status",
        Service::FaceDetection => "face_detection_status",
        Service::PersonTracking => "person_tracking_status",
        Service::SentimentDetection => "sentiment_detection_status",
        Service::PhraseDetection => "phrase_detection_status",
        Service::EntityDetection => "entity_detection_status",
    }
}

/// Conversion record tracking one stored file through the remote services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversionRecord {
    pub id: ConversionId,
    pub path_hash: PathHash,
    pub content_hash: ContentHash,
    pub status: ConversionStatus,
    pub services: ServiceStatuses,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Inbound status message posted by a remote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueMessage {
    pub id: i64,
    pub message_id: String,
    /// Remote process name, see [`Service::process_name`].
    pub process: String,
    pub status: String,
    /// Content hash of the object the message is about.
    pub object_key: ContentHash,
    pub body: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A queue message as delivered by the notification receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueueMessage {
    pub message_id: String,
    pub process: String,
    pub status: String,
    pub object_key: ContentHash,
    pub body: Option<String>,
}

/// Media properties extracted by the upstream metadata stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaMetadata {
    pub path_hash: PathHash,
    pub content_hash: ContentHash,
    /// Height of the first video stream in pixels; zero for audio-only media.
    pub height: u32,
    pub duration_secs: f64,
    pub video_streams: u32,
    pub audio_streams: u32,
}

/// Entry in the local blob store index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    pub path_hash: PathHash,
    pub content_hash: ContentHash,
    /// Store-relative path, always starting with `/`.
    pub path: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_statuses() {
        let statuses = ServiceStatuses::seeded(|s| {
            matches!(s, Service::Transcoding | Service::FaceDetection)
        });
        assert_eq!(statuses.transcoding, ConversionStatus::Accepted);
        assert_eq!(statuses.face_detection, ConversionStatus::Accepted);
        assert_eq!(statuses.transcription, ConversionStatus::NotApplicable);
        assert_eq!(statuses.entity_detection, ConversionStatus::NotApplicable);
    }

    #[test]
    fn test_get_set_cover_every_service() {
        let mut statuses = ServiceStatuses::uniform(ConversionStatus::Accepted);
        for service in Service::ALL {
            statuses.set(service, ConversionStatus::Finished);
            assert_eq!(statuses.get(service), ConversionStatus::Finished);
        }
        assert_eq!(statuses, ServiceStatuses::uniform(ConversionStatus::Finished));
    }

    #[test]
    fn test_open_services() {
        let mut statuses = ServiceStatuses::uniform(ConversionStatus::NotApplicable);
        statuses.transcoding = ConversionStatus::InProgress;
        statuses.label_detection = ConversionStatus::Accepted;
        statuses.face_detection = ConversionStatus::Finished;

        assert_eq!(
            statuses.open_services(),
            vec![Service::Transcoding, Service::LabelDetection]
        );
    }

    #[test]
    fn test_status_columns_are_distinct() {
        let mut columns: Vec<_> = Service::ALL.iter().map(|s| status_column(*s)).collect();
        columns.sort();
        columns.dedup();
        assert_eq!(columns.len(), Service::ALL.len());
    }
}
