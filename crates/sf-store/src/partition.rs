//! Partition CSV codec and the month-keyed idempotent merge.
//!
//! Each partition holds one (graph, year, month) of fully normalized rows:
//! the canonical timestamp column first, then the active variable columns.
//! A write always replaces the whole file; there is no row append path, so
//! a crashed write can never leave a partially merged partition behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDateTime};
use sf_common::{Result, STORED_TIME_FORMAT, TIME_COLUMN};
use sf_series::Frame;
use tracing::debug;

use crate::layout::StoreLayout;

/// Read one partition file into a frame.
///
/// The first header field is the canonical timestamp column; the rest are
/// value columns. Empty cells become nulls.
pub fn read_partition(path: &Path) -> Result<Frame> {
    let mut reader = csv::ReaderBuilder::new().from_path(path)?;
    let headers = reader.headers()?.clone();
    let value_names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let mut frame = Frame::with_columns(value_names);
    for record in reader.records() {
        let record = record?;
        let Some(raw_ts) = record.get(0) else {
            continue;
        };
        let Ok(ts) = NaiveDateTime::parse_from_str(raw_ts, STORED_TIME_FORMAT) else {
            continue;
        };
        let values: Vec<Option<f64>> = (1..headers.len())
            .map(|i| {
                record
                    .get(i)
                    .filter(|cell| !cell.is_empty())
                    .and_then(|cell| cell.parse::<f64>().ok())
            })
            .collect();
        frame.push_row(ts, &values);
    }
    Ok(frame)
}

/// Replace a partition file with the given frame.
pub fn write_partition(path: &Path, frame: &Frame) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![TIME_COLUMN.to_string()];
    header.extend(frame.columns.iter().map(|c| c.name.clone()));
    writer.write_record(&header)?;
    for i in 0..frame.len() {
        let mut record = vec![frame.timestamps[i].format(STORED_TIME_FORMAT).to_string()];
        for col in &frame.columns {
            record.push(match col.values[i] {
                Some(v) => format_value(v),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Render a value without trailing float noise (`5` not `5.0`) so that
/// re-ingesting our own output parses back to the same number.
fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Outer-merge two frames on timestamp, preferring the incoming value when
/// both sides provide one for the same (timestamp, column). The result is
/// restricted to `active` columns, sorted ascending, timestamps unique.
pub fn merge_frames(existing: &Frame, incoming: &Frame, active: &[String]) -> Frame {
    let mut rows: BTreeMap<NaiveDateTime, Vec<Option<f64>>> = BTreeMap::new();

    let mut absorb = |frame: &Frame| {
        for i in 0..frame.len() {
            let row = rows
                .entry(frame.timestamps[i])
                .or_insert_with(|| vec![None; active.len()]);
            for (slot, name) in row.iter_mut().zip(active) {
                if let Some(v) = frame.column(name).and_then(|c| c.values[i]) {
                    *slot = Some(v);
                }
            }
        }
    };
    absorb(existing);
    absorb(incoming);

    let mut out = Frame::with_columns(active.iter().cloned());
    for (ts, values) in rows {
        out.push_row(ts, &values);
    }
    out
}

/// Merge a normalized frame into the month-keyed partitions of `graph`.
///
/// Rows are grouped by (year, month); each group is merged into the
/// existing partition when one is present. `user_upload` marks user-driven
/// uploads, which may lawfully target months with no prior partition
/// (historical backfill); routine ingestion hits the same path since a
/// missing partition simply merges against an empty frame. Empty groups
/// are never written. Returns the paths written.
pub fn store_frame(
    layout: &StoreLayout,
    graph: &str,
    frame: &Frame,
    active: &[String],
    user_upload: bool,
) -> Result<Vec<PathBuf>> {
    let mut groups: BTreeMap<(i32, u32), Frame> = BTreeMap::new();
    for i in 0..frame.len() {
        let ts = frame.timestamps[i];
        let group = groups
            .entry((ts.year(), ts.month()))
            .or_insert_with(|| Frame::with_columns(frame.columns.iter().map(|c| c.name.clone())));
        let row = frame.row(i);
        group.push_row(ts, &row);
    }

    let mut written = Vec::new();
    for ((year, month), group) in groups {
        let path = layout.partition_path(graph, year, month);
        let existing = if path.exists() {
            read_partition(&path)?
        } else {
            Frame::with_columns(active.iter().cloned())
        };
        let merged = merge_frames(&existing, &group, active);
        if merged.is_empty() {
            continue;
        }
        write_partition(&path, &merged)?;
        debug!(
            graph,
            year,
            month,
            rows = merged.len(),
            user_upload,
            "partition written"
        );
        written.push(path);
    }
    Ok(written)
}
