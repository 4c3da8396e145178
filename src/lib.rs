//! Smartmedia - Media conversion tracking and transcoding cost estimation
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod pricing;
pub mod remote;
pub mod storage;
