//! The ingestion chain and its entry points.
//!
//! Every trigger (interval poll, registration backfill, user upload) runs
//! the same chain; only the error policy differs. Interactive callers get
//! the error back so the upload form can show it; unattended callers log
//! and continue with the remaining instruments in the cycle.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use sf_common::{IngestError, Result};
use sf_render::{aggregate, export_csv, render_chart, WindowMode};
use sf_schema::SchemaProvider;
use sf_store::{store_frame, DateRange, StoreLayout};
use tracing::{info, warn};

use crate::gapfill::fill_gaps;
use crate::normalize::normalize;

/// Everything a chain invocation needs, passed by value per call.
///
/// The interval timer owns only the trigger; holding the context here
/// instead of module-level state keeps concurrent chains for different
/// instruments independent.
pub struct PipelineContext<'a> {
    pub schemas: &'a dyn SchemaProvider,
    pub layout: StoreLayout,
}

/// How a chain invocation was triggered.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Scheduled caller: swallow per-instrument data errors after logging.
    pub unattended: bool,
    /// User-driven upload: merge into historical months freely.
    pub user_upload: bool,
}

/// What one successful chain invocation did.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub graph: String,
    pub rows: usize,
    pub partitions: Vec<PathBuf>,
}

fn run_chain(
    ctx: &PipelineContext<'_>,
    graph: &str,
    bytes: &[u8],
    opts: IngestOptions,
) -> Result<IngestOutcome> {
    let schema = ctx.schemas.graph_schema(graph)?;
    let mut frame = normalize(bytes, &schema)?;
    fill_gaps(&mut frame);
    frame.sort_by_time();
    let active = schema.active_variable_names();
    let partitions = store_frame(&ctx.layout, graph, &frame, &active, opts.user_upload)?;
    info!(graph, rows = frame.len(), partitions = partitions.len(), "ingested");
    Ok(IngestOutcome {
        graph: graph.to_string(),
        rows: frame.len(),
        partitions,
    })
}

/// Run the chain on in-memory raw bytes.
///
/// With `opts.unattended`, data errors from one bad source (column
/// mismatch, time format, transport) are logged and reported as `Ok(None)`
/// so a poll cycle can continue; everything else propagates.
pub fn ingest_bytes(
    ctx: &PipelineContext<'_>,
    graph: &str,
    bytes: &[u8],
    opts: IngestOptions,
) -> Result<Option<IngestOutcome>> {
    match run_chain(ctx, graph, bytes, opts) {
        Ok(outcome) => Ok(Some(outcome)),
        Err(e) if opts.unattended && e.recoverable_in_background() => {
            warn!(graph, code = e.code(), error = %e, "skipping instrument for this cycle");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Run the chain on a file path (user uploads, backfill temp files).
pub fn ingest_file(
    ctx: &PipelineContext<'_>,
    graph: &str,
    path: &Path,
    opts: IngestOptions,
) -> Result<Option<IngestOutcome>> {
    let bytes = fs::read(path)?;
    ingest_bytes(ctx, graph, &bytes, opts)
}

/// Regenerate the `full` and `recent` chart artifacts for a graph.
pub fn refresh_charts(ctx: &PipelineContext<'_>, graph: &str) -> Result<()> {
    let schema = ctx.schemas.graph_schema(graph)?;
    for mode in [WindowMode::Full, WindowMode::Recent] {
        let agg = aggregate(&ctx.layout, &schema, mode, None)?;
        render_chart(&ctx.layout, &schema, &agg)?;
    }
    Ok(())
}

/// Build the `download` export buffer for an explicit `[begin, end]` range.
pub fn export_range(
    ctx: &PipelineContext<'_>,
    graph: &str,
    begin: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<u8>> {
    if begin > end {
        return Err(IngestError::Render(format!(
            "empty range: {begin} is after {end}"
        )));
    }
    let schema = ctx.schemas.graph_schema(graph)?;
    let agg = aggregate(
        &ctx.layout,
        &schema,
        WindowMode::Download,
        Some(DateRange { begin, end }),
    )?;
    export_csv(&agg)
}
