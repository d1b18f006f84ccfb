//! Compact time-format notation.
//!
//! Instrument operators configure timestamp formats in a compact notation
//! where every letter stands for a strftime directive and punctuation passes
//! through verbatim: `d.m.Y H:M:S` expands to `%d.%m.%Y %H:%M:%S`.

/// Column name that marks a time column as Unix-epoch seconds.
///
/// When a graph's active time column carries this name its values are
/// interpreted as integer seconds since the epoch and the configured format
/// pattern is ignored.
pub const EPOCH_SENTINEL: &str = "timestamp";

/// Expand a compact format pattern into a chrono strftime pattern.
///
/// Every ASCII letter gets a `%` prefix; everything else is copied as-is.
pub fn expand_format(compact: &str) -> String {
    let mut out = String::with_capacity(compact.len() * 2);
    for ch in compact.chars() {
        if ch.is_ascii_alphabetic() {
            out.push('%');
        }
        out.push(ch);
    }
    out
}

/// Strip `%` markers from an expanded pattern for UI-facing labels.
pub fn visible_format(expanded: &str) -> String {
    expanded.replace('%', "")
}
