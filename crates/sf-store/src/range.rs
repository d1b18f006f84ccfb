//! Default display range derived from stored partitions.

use chrono::Duration;
use chrono::NaiveDateTime;
use sf_common::{IngestError, Result};

use crate::layout::StoreLayout;
use crate::partition::read_partition;

/// Days of lookback for the default display window.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 14;

/// Inclusive display bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Default display window for a graph.
///
/// `end` is the final row's timestamp of the chronologically-last partition;
/// `begin` is 14 days earlier. A default window, not a hard data boundary:
/// callers may override both bounds. No partitions at all is the `NoData`
/// case, reported distinctly from normalization errors.
pub fn default_range(layout: &StoreLayout, graph: &str) -> Result<DateRange> {
    let partitions = layout.list_partitions(graph)?;
    let last = partitions.last().ok_or_else(|| IngestError::NoData {
        graph: graph.to_string(),
    })?;
    let frame = read_partition(last)?;
    let end = *frame
        .timestamps
        .last()
        .ok_or_else(|| IngestError::NoData {
            graph: graph.to_string(),
        })?;
    Ok(DateRange {
        begin: end - Duration::days(DEFAULT_LOOKBACK_DAYS),
        end,
    })
}
