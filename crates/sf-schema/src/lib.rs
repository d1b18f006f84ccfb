//! Sensorfleet graph schema loading and validation.
//!
//! This crate provides:
//! - Typed structs for per-graph column configuration
//! - Compact time-format pattern expansion (`d.m.Y H:M:S` -> `%d.%m.%Y %H:%M:%S`)
//! - The `SchemaProvider` trait plus a JSON-file-backed implementation

pub mod format;
pub mod provider;
pub mod schema;

pub use format::{expand_format, visible_format, EPOCH_SENTINEL};
pub use provider::{Instrument, JsonSchemaProvider, SchemaProvider};
pub use schema::{GraphSchema, TimeColumn, TimeSpec, VariableColumn};
