//! Sensorfleet shared types and constants.
//!
//! This crate provides:
//! - The unified error taxonomy for the ingestion pipeline
//! - The canonical timestamp column name shared by all graphs

pub mod error;

pub use error::{IngestError, Result};

/// Canonical name of the timestamp column in every partition file.
///
/// The Normalizer renames each graph's configured time column to this name
/// so downstream components never branch on source column naming.
pub const TIME_COLUMN: &str = "timestamp";

/// Timestamp format used inside partition files and chart payloads.
pub const STORED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
