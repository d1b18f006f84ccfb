//! Sensorfleet ingestion core.
//!
//! The chain every trigger runs is the same:
//!
//! ```text
//! raw bytes ──► normalize ──► fill_gaps ──► store_frame ──► refresh_charts
//! ```
//!
//! Two triggers feed it: the interval poller (newest remote file per
//! instrument, unattended) and user uploads / registration backfill
//! (surfaced errors, historical months allowed).

pub mod chain;
pub mod gapfill;
pub mod normalize;
pub mod poll;

pub use chain::{
    export_range, ingest_bytes, ingest_file, refresh_charts, IngestOptions, IngestOutcome,
    PipelineContext,
};
pub use gapfill::{fill_gaps, GAP_SLACK};
pub use normalize::normalize;
pub use poll::{backfill_instrument, poll_cycle, run_poller, FetchClient, HttpFetchClient, RemoteFile};
