//! Status transitions applied to a conversion record in memory.
//!
//! Nothing here touches storage; the orchestrator persists the result with a
//! guarded write.

use chrono::{DateTime, Utc};
use smartmedia_common::{ConversionStatus, RemoteOutcome, Service};
use smartmedia_db::models::{ConversionRecord, ServiceStatuses};

/// Mark a record as sent to the remote pipeline.
pub fn mark_dispatched(record: &mut ConversionRecord) {
    record.status = ConversionStatus::InProgress;
    for service in Service::ALL {
        if record.services.get(service) == ConversionStatus::Accepted {
            record.services.set(service, ConversionStatus::InProgress);
        }
    }
}

/// Mark a record whose dispatch failed.
pub fn mark_dispatch_failed(record: &mut ConversionRecord, now: DateTime<Utc>) {
    record.status = ConversionStatus::Error;
    fail_open_services(&mut record.services);
    record.completed_at = Some(now);
}

/// Set every still-open service to `Error`.
pub fn fail_open_services(services: &mut ServiceStatuses) {
    for service in services.open_services() {
        services.set(service, ConversionStatus::Error);
    }
}

/// What applying a message means for the rest of the record's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Continue,
    /// The record is finished with; remaining messages are ignored.
    Stop,
}

/// Apply a failure outcome from a remote service.
///
/// A transcoding failure ends the whole conversion.
pub fn apply_failure(record: &mut ConversionRecord, service: Service, now: DateTime<Utc>) -> Applied {
    if service == Service::Transcoding {
        record.status = ConversionStatus::Error;
        fail_open_services(&mut record.services);
        record.completed_at = Some(now);
        return Applied::Stop;
    }
    record.services.set(service, ConversionStatus::Error);
    Applied::Continue
}

/// Apply the result of handling a message outcome once its artifacts have
/// been retrieved, or failed to be.
pub fn apply_outcome(
    record: &mut ConversionRecord,
    service: Service,
    outcome: RemoteOutcome,
    retrieved: bool,
    now: DateTime<Utc>,
) -> Applied {
    match outcome {
        RemoteOutcome::Failed => apply_failure(record, service, now),
        RemoteOutcome::Succeeded => {
            let status = if retrieved {
                ConversionStatus::Finished
            } else {
                ConversionStatus::Error
            };
            record.services.set(service, status);
            Applied::Continue
        }
    }
}

/// Aggregate status implied by the per-service statuses of an in-progress record.
///
/// `Finished` once every service is finished or not applicable, `Error` once
/// every service is terminal and at least one failed, otherwise `None`.
pub fn evaluate_aggregate(services: &ServiceStatuses) -> Option<ConversionStatus> {
    let mut all_complete = true;
    for (_, status) in services.iter() {
        if status.is_open() {
            return None;
        }
        all_complete &= status.is_complete();
    }
    Some(if all_complete {
        ConversionStatus::Finished
    } else {
        ConversionStatus::Error
    })
}

/// Roll the aggregate status forward if the services allow it.
///
/// Returns `true` when the record reached a terminal status.
pub fn settle(record: &mut ConversionRecord, now: DateTime<Utc>) -> bool {
    if record.status != ConversionStatus::InProgress {
        return record.status.is_terminal();
    }
    match evaluate_aggregate(&record.services) {
        Some(status) => {
            record.status = status;
            record.completed_at = Some(now);
            true
        }
        None => false,
    }
}
