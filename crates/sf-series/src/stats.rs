//! Statistics behind gap detection and the recent-window denoise pass.
//!
//! All functions are pure and guard their degenerate inputs (empty slices,
//! constant series) by returning `None` instead of NaN.

use chrono::{Duration, NaiveDateTime};

use crate::frame::Frame;

/// Statistical mode of the deltas between consecutive timestamps.
///
/// Ties resolve to the smallest delta. Returns `None` for fewer than two
/// timestamps. Input must be sorted ascending.
pub fn mode_delta(sorted: &[NaiveDateTime]) -> Option<Duration> {
    if sorted.len() < 2 {
        return None;
    }
    let mut counts: std::collections::HashMap<i64, usize> = std::collections::HashMap::new();
    for pair in sorted.windows(2) {
        let secs = (pair[1] - pair[0]).num_seconds();
        *counts.entry(secs).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(da, ca), (db, cb)| ca.cmp(cb).then(db.cmp(da)))
        .map(|(secs, _)| Duration::seconds(secs))
}

/// Linearly interpolated percentile; `q` in `[0, 1]`.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Sample standard deviation; `None` for fewer than two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// IQR-style admissible value band derived from the 10th/90th percentiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissibleBand {
    pub lo: f64,
    pub hi: f64,
}

impl AdmissibleBand {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }
}

/// `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]` with Q1/Q3 taken at the 10th/90th
/// percentiles, which is wide enough to keep real excursions while
/// rejecting spikes for the std estimate below.
pub fn iqr_band(values: &[f64]) -> Option<AdmissibleBand> {
    let q1 = percentile(values, 0.10)?;
    let q3 = percentile(values, 0.90)?;
    let iqr = q3 - q1;
    Some(AdmissibleBand {
        lo: q1 - 1.5 * iqr,
        hi: q3 + 1.5 * iqr,
    })
}

/// Denoise/point-reduction pass for high-density recent windows.
///
/// Per column, a standard deviation is estimated from the in-band subset of
/// values. A row counts as "stable" when every comparable column moved by at
/// most one estimated std since the previous row. Adjacent stable rows are
/// then collapsed pairwise by averaging, halving stable runs while keeping
/// transition points intact.
pub fn denoise_frame(frame: &mut Frame) {
    let n = frame.len();
    if n < 3 {
        return;
    }

    let stds: Vec<Option<f64>> = frame
        .columns
        .iter()
        .map(|col| {
            let vals: Vec<f64> = col.values.iter().filter_map(|v| *v).collect();
            let band = iqr_band(&vals)?;
            let in_band: Vec<f64> = vals.into_iter().filter(|v| band.contains(*v)).collect();
            let std = std_dev(&in_band)?;
            if std > 0.0 {
                Some(std)
            } else {
                None
            }
        })
        .collect();

    let mut stable = vec![false; n];
    for i in 1..n {
        let mut comparable = false;
        let mut ok = true;
        for (col, std) in frame.columns.iter().zip(&stds) {
            let (Some(std), Some(prev), Some(cur)) = (std, col.values[i - 1], col.values[i])
            else {
                continue;
            };
            comparable = true;
            if (cur - prev).abs() / std > 1.0 {
                ok = false;
                break;
            }
        }
        stable[i] = comparable && ok;
    }

    let names: Vec<String> = frame.columns.iter().map(|c| c.name.clone()).collect();
    let mut out = Frame::with_columns(names);
    let mut i = 0;
    while i < n {
        if stable[i] && i + 1 < n && stable[i + 1] {
            let mid = frame.timestamps[i]
                + Duration::seconds((frame.timestamps[i + 1] - frame.timestamps[i]).num_seconds() / 2);
            let values: Vec<Option<f64>> = frame
                .columns
                .iter()
                .map(|col| match (col.values[i], col.values[i + 1]) {
                    (Some(a), Some(b)) => Some((a + b) / 2.0),
                    (Some(a), None) => Some(a),
                    (None, Some(b)) => Some(b),
                    (None, None) => None,
                })
                .collect();
            out.push_row(mid, &values);
            i += 2;
        } else {
            let row = frame.row(i);
            out.push_row(frame.timestamps[i], &row);
            i += 1;
        }
    }
    *frame = out;
}
