//! Column-oriented time-series frame.
//!
//! A `Frame` is the unit of data moved through the pipeline: one timestamp
//! vector plus parallel value columns of equal length. Values are
//! `Option<f64>` so gap-boundary rows and unparsable cells stay explicit
//! nulls rather than sentinel numbers.

use chrono::NaiveDateTime;

/// One named value column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Timestamps plus parallel value columns; all vectors share one length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub timestamps: Vec<NaiveDateTime>,
    pub columns: Vec<Column>,
}

impl Frame {
    /// Empty frame with the given column names.
    pub fn with_columns<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            timestamps: Vec::new(),
            columns: names
                .into_iter()
                .map(|name| Column {
                    name: name.into(),
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Append one row; `values` must be in column order and of matching length.
    pub fn push_row(&mut self, ts: NaiveDateTime, values: &[Option<f64>]) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.timestamps.push(ts);
        for (col, v) in self.columns.iter_mut().zip(values) {
            col.values.push(*v);
        }
    }

    /// One row's values, in column order.
    pub fn row(&self, idx: usize) -> Vec<Option<f64>> {
        self.columns.iter().map(|c| c.values[idx]).collect()
    }

    /// Stable sort of all rows by timestamp, ascending.
    pub fn sort_by_time(&mut self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);
        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
        for col in &mut self.columns {
            col.values = order.iter().map(|&i| col.values[i]).collect();
        }
    }

    /// Drop rows identical to their predecessor in timestamp and every value.
    /// Assumes the frame is already sorted by time.
    pub fn dedup_exact(&mut self) {
        if self.len() < 2 {
            return;
        }
        let mut keep = vec![true; self.len()];
        for i in 1..self.len() {
            let same_values = self
                .columns
                .iter()
                .all(|c| c.values[i] == c.values[i - 1]);
            if self.timestamps[i] == self.timestamps[i - 1] && same_values {
                keep[i] = false;
            }
        }
        self.retain_rows(&keep);
    }

    /// Keep only the last row of each run of equal timestamps.
    /// Assumes the frame is already sorted by time.
    pub fn dedup_timestamps_keep_last(&mut self) {
        if self.len() < 2 {
            return;
        }
        let mut keep = vec![true; self.len()];
        for i in 0..self.len() - 1 {
            if self.timestamps[i] == self.timestamps[i + 1] {
                keep[i] = false;
            }
        }
        self.retain_rows(&keep);
    }

    /// Restrict and reorder columns to `names`; absent columns become all-null.
    pub fn select_columns(&mut self, names: &[String]) {
        let len = self.len();
        self.columns = names
            .iter()
            .map(|name| {
                self.columns
                    .iter()
                    .find(|c| &c.name == name)
                    .cloned()
                    .unwrap_or_else(|| Column {
                        name: name.clone(),
                        values: vec![None; len],
                    })
            })
            .collect();
    }

    /// Keep only rows whose timestamp falls inside `[begin, end]`.
    pub fn clamp(&mut self, begin: NaiveDateTime, end: NaiveDateTime) {
        let keep: Vec<bool> = self
            .timestamps
            .iter()
            .map(|ts| *ts >= begin && *ts <= end)
            .collect();
        self.retain_rows(&keep);
    }

    /// Mean of a column's present values; `None` when no value is present.
    pub fn column_mean(&self, name: &str) -> Option<f64> {
        let col = self.column(name)?;
        let present: Vec<f64> = col.values.iter().filter_map(|v| *v).collect();
        if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
    }

    /// Concatenate frames, unioning their column sets by name.
    ///
    /// Column order follows first appearance; rows missing a column get null.
    pub fn vstack(frames: Vec<Frame>) -> Frame {
        let mut names: Vec<String> = Vec::new();
        for frame in &frames {
            for col in &frame.columns {
                if !names.contains(&col.name) {
                    names.push(col.name.clone());
                }
            }
        }
        let mut out = Frame::with_columns(names.clone());
        for frame in frames {
            for i in 0..frame.len() {
                let values: Vec<Option<f64>> = names
                    .iter()
                    .map(|n| frame.column(n).and_then(|c| c.values[i]))
                    .collect();
                out.push_row(frame.timestamps[i], &values);
            }
        }
        out
    }

    fn retain_rows(&mut self, keep: &[bool]) {
        let mut i = 0;
        self.timestamps.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        for col in &mut self.columns {
            let mut i = 0;
            col.values.retain(|_| {
                let k = keep[i];
                i += 1;
                k
            });
        }
    }
}
