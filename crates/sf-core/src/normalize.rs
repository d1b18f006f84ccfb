//! Raw file normalization.
//!
//! Instruments disagree on nearly everything: separators, decimal marks,
//! timestamp formats, encodings. This module turns one raw delimited file
//! plus a graph schema into a canonical frame: one `timestamp` column and
//! only the active variable columns.

use chrono::{DateTime, NaiveDateTime};
use sf_common::{IngestError, Result};
use sf_schema::{GraphSchema, TimeSpec};
use sf_series::Frame;
use tracing::debug;

/// Decode raw bytes as UTF-8, falling back to Latin-1.
///
/// Latin-1 maps every byte straight to the code point of the same value,
/// so the fallback cannot fail; mojibake beyond those two encodings is the
/// instrument vendor's problem.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Pick the field delimiter by counting candidates in the header line.
/// Ties resolve tab, then semicolon, then comma.
fn sniff_delimiter(header_line: &str) -> u8 {
    let candidates = [b'\t', b';', b','];
    let mut best = b',';
    let mut best_count = 0usize;
    for cand in candidates {
        let count = header_line.bytes().filter(|b| *b == cand).count();
        if count > best_count {
            best = cand;
            best_count = count;
        }
    }
    best
}

/// Parse a numeric cell, accepting decimal commas.
fn parse_number(cell: &str) -> Option<f64> {
    let cleaned = cell.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn parse_time(raw: &str, spec: &TimeSpec, schema: &GraphSchema) -> Result<NaiveDateTime> {
    match spec {
        TimeSpec::EpochSeconds => raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| IngestError::TimeFormat {
                graph: schema.name.clone(),
                value: raw.to_string(),
                format: "unix-epoch".into(),
            }),
        TimeSpec::Pattern(fmt) => {
            NaiveDateTime::parse_from_str(raw.trim(), fmt).map_err(|_| IngestError::TimeFormat {
                graph: schema.name.clone(),
                value: raw.to_string(),
                format: fmt.clone(),
            })
        }
    }
}

/// Normalize one raw file against a graph schema.
///
/// Pure transform: validates required columns against the header, trims
/// cells, canonicalizes the timestamp column to [`sf_common::TIME_COLUMN`], keeps only
/// active variable columns, and sorts ascending by time. Structurally
/// malformed rows are skipped; an unparsable timestamp value is fatal.
pub fn normalize(bytes: &[u8], schema: &GraphSchema) -> Result<Frame> {
    let text = decode_text(bytes);
    let time_spec = schema.time_spec()?;
    let time_name = &schema.active_time_column()?.name;
    let active = schema.active_variable_names();

    let delimiter = sniff_delimiter(text.lines().next().unwrap_or(""));
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h == name);

    let mut missing: Vec<String> = Vec::new();
    let time_idx = match find(time_name) {
        Some(idx) => idx,
        None => {
            missing.push(time_name.clone());
            0
        }
    };
    let mut var_indices: Vec<usize> = Vec::with_capacity(active.len());
    for name in &active {
        match find(name) {
            Some(idx) => var_indices.push(idx),
            None => missing.push(name.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(IngestError::ColumnMismatch {
            graph: schema.name.clone(),
            missing,
        });
    }

    let mut frame = Frame::with_columns(active);
    let mut skipped = 0usize;
    for record in reader.records() {
        // tokenization failures skip the row rather than aborting the file
        let Ok(record) = record else {
            skipped += 1;
            continue;
        };
        let Some(raw_time) = record.get(time_idx).filter(|c| !c.trim().is_empty()) else {
            skipped += 1;
            continue;
        };
        let ts = parse_time(raw_time, &time_spec, schema)?;
        let values: Vec<Option<f64>> = var_indices
            .iter()
            .map(|&idx| record.get(idx).and_then(parse_number))
            .collect();
        frame.push_row(ts, &values);
    }
    if skipped > 0 {
        debug!(graph = %schema.name, skipped, "malformed rows skipped");
    }

    frame.sort_by_time();
    Ok(frame)
}
