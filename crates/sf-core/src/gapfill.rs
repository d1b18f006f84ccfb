//! Synthetic gap boundaries.
//!
//! A line chart drawn across two real samples far apart in time would
//! interpolate a continuous (false) signal across a genuine outage. A pair
//! of null-valued rows just inside the gap breaks the rendered line at the
//! boundary without discarding the surrounding real data.

use chrono::Duration;
use sf_series::{mode_delta, Frame};
use tracing::debug;

/// Slack factor applied to the modal sampling delta before a delta counts
/// as a large gap.
pub const GAP_SLACK: f64 = 1.1;

/// Drop exact duplicate rows, then append two all-null boundary rows for
/// every consecutive pair whose delta exceeds the gap threshold: one at
/// (earlier + 1 s), one at (later - 1 s).
///
/// Input must be sorted by time. Synthetic rows are appended at the end;
/// the caller re-sorts before the partition write.
pub fn fill_gaps(frame: &mut Frame) {
    frame.dedup_exact();
    let Some(mode) = mode_delta(&frame.timestamps) else {
        return;
    };
    let threshold = mode.num_seconds() as f64 * GAP_SLACK;
    if threshold <= 0.0 {
        // sub-second or duplicate-timestamp cadence, nothing meaningful to fill
        return;
    }

    let mut boundaries = Vec::new();
    for pair in frame.timestamps.windows(2) {
        let delta = (pair[1] - pair[0]).num_seconds() as f64;
        if delta > threshold {
            boundaries.push(pair[0] + Duration::seconds(1));
            boundaries.push(pair[1] - Duration::seconds(1));
        }
    }
    if boundaries.is_empty() {
        return;
    }
    debug!(gaps = boundaries.len() / 2, "gap boundaries synthesized");

    let null_row = vec![None; frame.columns.len()];
    for ts in boundaries {
        frame.push_row(ts, &null_row);
    }
}
