//! Sensorfleet partitioned historical storage.
//!
//! This crate provides:
//! - The on-disk path layout for partitions and chart artifacts
//! - Partition CSV read/write and the idempotent month-keyed merge
//! - The default display range derived from stored partitions

pub mod layout;
pub mod partition;
pub mod range;

pub use layout::StoreLayout;
pub use partition::{merge_frames, read_partition, store_frame, write_partition};
pub use range::{default_range, DateRange, DEFAULT_LOOKBACK_DAYS};
