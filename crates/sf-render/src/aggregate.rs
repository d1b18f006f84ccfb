//! Windowed aggregation: partition loading, scaling, denoising, ordering.

use chrono::{Datelike, Duration, NaiveDateTime};
use sf_common::Result;
use sf_schema::GraphSchema;
use sf_series::{denoise_frame, Frame};
use sf_store::{default_range, read_partition, DateRange, StoreLayout};
use tracing::debug;

/// Which window product is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Medium window, 14 days, chart artifact.
    Full,
    /// Short window, 3 days, chart artifact with denoising.
    Recent,
    /// Arbitrary explicit bounds, raw CSV export.
    Download,
}

impl WindowMode {
    pub fn dir_name(self) -> &'static str {
        match self {
            WindowMode::Full => "full",
            WindowMode::Recent => "recent",
            WindowMode::Download => "download",
        }
    }

    /// Fixed span for chart windows; `Download` has caller-supplied bounds.
    pub fn span(self) -> Option<Duration> {
        match self {
            WindowMode::Full => Some(Duration::days(14)),
            WindowMode::Recent => Some(Duration::days(3)),
            WindowMode::Download => None,
        }
    }
}

/// Above this many cells (rows x active columns) a recent window gets the
/// denoise/point-reduction pass before rendering.
pub const DENSITY_THRESHOLD: usize = 20_000;

/// Months of forward padding when walking partitions for a window, so
/// sparse instruments whose rows land far apart are still picked up.
const FORWARD_PAD_DAYS: i64 = 100;

/// A windowed, scaled, (possibly) denoised slice of one graph's data.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub frame: Frame,
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
    pub mode: WindowMode,
}

/// Load and concatenate every partition whose month may intersect
/// `[begin, end]`, padded forward generously.
fn load_window(
    layout: &StoreLayout,
    graph: &str,
    begin: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Frame> {
    let padded_end = end + Duration::days(FORWARD_PAD_DAYS);
    let mut frames = Vec::new();
    let (mut year, mut month) = (begin.year(), begin.month());
    while (year, month) <= (padded_end.year(), padded_end.month()) {
        let path = layout.partition_path(graph, year, month);
        if path.exists() {
            frames.push(read_partition(&path)?);
        }
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    let mut frame = Frame::vstack(frames);
    frame.sort_by_time();
    frame.dedup_timestamps_keep_last();
    Ok(frame)
}

/// Multiply each active column by its configured coefficient.
///
/// Scaling happens here, before any denoising, so the denoise std estimate
/// and every output mode (chart and download alike) see display units.
fn apply_coefficients(frame: &mut Frame, schema: &GraphSchema) {
    for var in schema.active_variables() {
        if (var.coefficient - 1.0).abs() < f64::EPSILON {
            continue;
        }
        if let Some(col) = frame.columns.iter_mut().find(|c| c.name == var.name) {
            for v in col.values.iter_mut().flatten() {
                *v *= var.coefficient;
            }
        }
    }
}

/// Active columns sorted by descending mean, so larger-magnitude series are
/// drawn first and smaller series layer on top and stay legible.
pub fn draw_order(frame: &Frame, schema: &GraphSchema) -> Vec<String> {
    let mut names: Vec<(String, f64)> = schema
        .active_variables()
        .map(|v| {
            (
                v.name.clone(),
                frame.column_mean(&v.name).unwrap_or(f64::NEG_INFINITY),
            )
        })
        .collect();
    names.sort_by(|a, b| b.1.total_cmp(&a.1));
    names.into_iter().map(|(n, _)| n).collect()
}

/// Build the windowed series for one graph and mode.
///
/// `explicit` bounds are required for `Download` and optional otherwise;
/// without them the bounds derive from the stored default range. A window
/// that no partition covers yields an empty frame, not an error.
pub fn aggregate(
    layout: &StoreLayout,
    schema: &GraphSchema,
    mode: WindowMode,
    explicit: Option<DateRange>,
) -> Result<Aggregation> {
    let range = match explicit {
        Some(r) => r,
        None => default_range(layout, &schema.name)?,
    };
    let (begin, end) = match mode.span() {
        Some(span) => (range.end - span, range.end),
        None => (range.begin, range.end),
    };

    let mut frame = load_window(layout, &schema.name, begin, end)?;
    frame.select_columns(&schema.active_variable_names());
    frame.clamp(begin, end);
    apply_coefficients(&mut frame, schema);

    let cells = frame.len() * frame.columns.len();
    if mode == WindowMode::Recent && cells > DENSITY_THRESHOLD {
        let before = frame.len();
        denoise_frame(&mut frame);
        debug!(
            graph = %schema.name,
            before,
            after = frame.len(),
            "denoise pass applied"
        );
    }

    Ok(Aggregation {
        frame,
        begin,
        end,
        mode,
    })
}
