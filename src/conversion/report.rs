//! Per-record results of a batch run.

use std::collections::BTreeMap;

use serde::Serialize;
use smartmedia_common::{ConversionStatus, PathHash};

/// What a batch did with one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// A new conversion record was written.
    Created,
    /// A record already existed for the file or its content.
    AlreadyExists,
    /// The stored file could not be found.
    FileMissing,
    Dispatched,
    DispatchFailed { reason: String },
    /// Messages were applied; `status` is the aggregate status afterwards.
    Reconciled {
        status: ConversionStatus,
        applied: usize,
    },
    /// Another process advanced the record first; nothing was written.
    LostUpdate,
}

impl RecordOutcome {
    fn kind(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
            Self::FileMissing => "file_missing",
            Self::Dispatched => "dispatched",
            Self::DispatchFailed { .. } => "dispatch_failed",
            Self::Reconciled { status, .. } => match status {
                ConversionStatus::Finished => "finished",
                ConversionStatus::Error => "failed",
                _ => "pending",
            },
            Self::LostUpdate => "lost_update",
        }
    }
}

/// Outcomes of one batch, keyed by path hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub outcomes: BTreeMap<PathHash, RecordOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path_hash: PathHash, outcome: RecordOutcome) {
        self.outcomes.insert(path_hash, outcome);
    }

    pub fn get(&self, path_hash: &PathHash) -> Option<&RecordOutcome> {
        self.outcomes.get(path_hash)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of records per outcome kind.
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for outcome in self.outcomes.values() {
            *counts.entry(outcome.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// Reports of one backfill, dispatch and reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub backfill: BatchReport,
    pub dispatch: BatchReport,
    pub reconcile: BatchReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_kinds() {
        let mut report = BatchReport::new();
        report.record(PathHash::new("a"), RecordOutcome::Dispatched);
        report.record(PathHash::new("b"), RecordOutcome::Dispatched);
        report.record(
            PathHash::new("c"),
            RecordOutcome::Reconciled {
                status: ConversionStatus::InProgress,
                applied: 0,
            },
        );

        let summary = report.summary();
        assert_eq!(summary.get("dispatched"), Some(&2));
        assert_eq!(summary.get("pending"), Some(&1));
        assert_eq!(report.len(), 3);
    }

    #[test]
    fn test_serializes_keyed_by_path_hash() {
        let mut report = BatchReport::new();
        report.record(
            PathHash::new("abc"),
            RecordOutcome::DispatchFailed {
                reason: "timeout".into(),
            },
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"]["abc"]["outcome"], "dispatch_failed");
        assert_eq!(json["outcomes"]["abc"]["reason"], "timeout");
    }
}
