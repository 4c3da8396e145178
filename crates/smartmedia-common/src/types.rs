//! Core type definitions for conversion tracking.
//!
//! [`ConversionStatus`] is shared by the aggregate status of a conversion and
//! every per-service status. [`Service`] enumerates the remote processes a
//! file can be sent through and how each one names itself in queue messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing status of a conversion or of one service within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    /// Record exists but has not been dispatched.
    Accepted,
    /// Dispatched and awaiting remote completion.
    InProgress,
    /// Completed without error.
    Finished,
    /// Completed with error.
    Error,
    /// Disabled by configuration and excluded from the aggregate.
    NotApplicable,
}

impl ConversionStatus {
    /// Returns `true` once no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::NotApplicable)
    }

    /// Returns `true` while the service still expects a remote result.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Accepted | Self::InProgress)
    }

    /// Returns `true` if the status counts as done for aggregate completion.
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Finished | Self::NotApplicable)
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Finished => write!(f, "finished"),
            Self::Error => write!(f, "error"),
            Self::NotApplicable => write!(f, "not_applicable"),
        }
    }
}

impl std::str::FromStr for ConversionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "in_progress" => Ok(Self::InProgress),
            "finished" => Ok(Self::Finished),
            "error" => Ok(Self::Error),
            "not_applicable" => Ok(Self::NotApplicable),
            _ => Err(format!("Invalid conversion status: {}", s)),
        }
    }
}

/// A remote processing service tracked per conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Transcoding,
    Transcription,
    LabelDetection,
    ModerationDetection,
    FaceDetection,
    PersonTracking,
    SentimentDetection,
    PhraseDetection,
    EntityDetection,
}

impl Service {
    /// Every tracked service, transcoding first.
    pub const ALL: [Service; 9] = [
        Service::Transcoding,
        Service::Transcription,
        Service::LabelDetection,
        Service::ModerationDetection,
        Service::FaceDetection,
        Service::PersonTracking,
        Service::SentimentDetection,
        Service::PhraseDetection,
        Service::EntityDetection,
    ];

    /// Services that can be switched off, in dispatch flag order.
    pub const OPTIONAL: [Service; 8] = [
        Service::Transcription,
        Service::LabelDetection,
        Service::ModerationDetection,
        Service::FaceDetection,
        Service::PersonTracking,
        Service::SentimentDetection,
        Service::PhraseDetection,
        Service::EntityDetection,
    ];

    /// Name the service uses for itself in inbound queue messages.
    pub fn process_name(self) -> &'static str {
        match self {
            Self::Transcoding => "elastic_transcoder",
            Self::Transcription => "StartTranscriptionJob",
            Self::LabelDetection => "StartLabelDetection",
            Self::ModerationDetection => "StartContentModeration",
            Self::FaceDetection => "StartFaceDetection",
            Self::PersonTracking => "StartPersonTracking",
            Self::SentimentDetection => "DetectSentiment",
            Self::PhraseDetection => "DetectKeyPhrases",
            Self::EntityDetection => "DetectEntities",
        }
    }

    /// Look up a service by its queue message process name.
    pub fn from_process_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.process_name() == name)
    }

    /// Object name of the single result artifact of an analysis service.
    ///
    /// Transcoding produces a set of files and has no single artifact.
    pub fn artifact_name(self) -> Option<&'static str> {
        match self {
            Self::Transcoding => None,
            Self::Transcription => Some("Transcription"),
            Self::LabelDetection => Some("Labels"),
            Self::ModerationDetection => Some("ModerationLabels"),
            Self::FaceDetection => Some("Faces"),
            Self::PersonTracking => Some("Persons"),
            Self::SentimentDetection => Some("SentimentAnalysis"),
            Self::PhraseDetection => Some("KeyPhrases"),
            Self::EntityDetection => Some("Entities"),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transcoding => write!(f, "transcoding"),
            Self::Transcription => write!(f, "transcription"),
            Self::LabelDetection => write!(f, "label_detection"),
            Self::ModerationDetection => write!(f, "moderation_detection"),
            Self::FaceDetection => write!(f, "face_detection"),
            Self::PersonTracking => write!(f, "person_tracking"),
            Self::SentimentDetection => write!(f, "sentiment_detection"),
            Self::PhraseDetection => write!(f, "phrase_detection"),
            Self::EntityDetection => write!(f, "entity_detection"),
        }
    }
}

/// Outcome reported by a terminal queue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOutcome {
    Succeeded,
    Failed,
}

impl RemoteOutcome {
    /// Message status values reporting success.
    pub const SUCCESS_STATUSES: [&'static str; 2] = ["COMPLETED", "SUCCEEDED"];

    /// Message status values reporting failure.
    pub const ERROR_STATUSES: [&'static str; 2] = ["ERROR", "FAILED"];

    /// Classify a raw message status. Progress and warning states are `None`.
    pub fn from_message_status(status: &str) -> Option<Self> {
        if Self::SUCCESS_STATUSES.contains(&status) {
            Some(Self::Succeeded)
        } else if Self::ERROR_STATUSES.contains(&status) {
            Some(Self::Failed)
        } else {
            None
        }
    }

    /// All message status values that carry an outcome.
    pub fn terminal_statuses() -> impl Iterator<Item = &'static str> {
        Self::SUCCESS_STATUSES
            .into_iter()
            .chain(Self::ERROR_STATUSES)
    }
}
