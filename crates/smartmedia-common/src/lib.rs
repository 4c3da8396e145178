//! Smartmedia-Common: Shared identifiers, status types, and errors.
//!
//! This crate provides functionality used across smartmedia:
//!
//! - **Typed IDs**: Newtypes for path hashes, content hashes, and conversion ids
//! - **Core Types**: The conversion status lifecycle and the remote services
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use smartmedia_common::{ConversionStatus, Service, Error, Result};
//!
//! assert!(ConversionStatus::Finished.is_terminal());
//! assert_eq!(Service::LabelDetection.process_name(), "StartLabelDetection");
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("conversion"))
//! }
//! # assert!(example().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
