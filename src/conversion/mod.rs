//! Conversion lifecycle management.
//!
//! A conversion tracks one stored file through the remote transcoding and
//! analysis services:
//!
//! - **Create / backfill**: a record is written once per file with the
//!   configured services and presets
//! - **Dispatch**: accepted records are uploaded to the remote pipeline
//! - **Reconcile**: status messages from the services are applied and
//!   finished results copied into the blob store
//!
//! See [`ConversionOrchestrator`] for the batch operations.

mod estimate;
mod orchestrator;
mod report;
mod settings;
pub mod state;

pub use estimate::{CostEstimator, PresetCatalog, RecordEstimate};
pub use orchestrator::ConversionOrchestrator;
pub use report::{BatchReport, CycleReport, RecordOutcome};
pub use settings::{
    normalize_preset_ids, parse_preset_ids, OrchestratorSettings, ServiceSelection,
    DEFAULT_BATCH_SIZE,
};
