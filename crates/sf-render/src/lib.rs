//! Sensorfleet aggregation and rendering.
//!
//! This crate turns stored partitions into the three window products:
//! `full` and `recent` chart artifacts (self-contained HTML) and the
//! `download` CSV export buffer.

pub mod aggregate;
pub mod chart;
pub mod color;
pub mod export;

pub use aggregate::{aggregate, draw_order, Aggregation, WindowMode, DENSITY_THRESHOLD};
pub use chart::render_chart;
pub use color::assign_colors;
pub use export::export_csv;
