//! Chart artifact rendering.
//!
//! The artifact is a self-contained HTML page embedding the draw-ordered,
//! colored, visibility-flagged series as a plotly config. It is written to
//! a per-graph, per-mode location and later served by the external web
//! layer as-is.

use std::fs;
use std::path::PathBuf;

use askama::Template;
use serde_json::{json, Value};
use sf_common::{IngestError, Result, STORED_TIME_FORMAT};
use sf_schema::GraphSchema;
use sf_store::StoreLayout;
use tracing::info;

use crate::aggregate::{draw_order, Aggregation, WindowMode};
use crate::color::assign_colors;

#[derive(Template)]
#[template(path = "chart.html")]
struct ChartTemplate<'a> {
    title: &'a str,
    traces: &'a str,
    layout: &'a str,
}

/// Render the chart artifact for a `full`/`recent` aggregation and write it
/// to the layout's per-mode location. Returns the path written.
pub fn render_chart(
    layout: &StoreLayout,
    schema: &GraphSchema,
    agg: &Aggregation,
) -> Result<PathBuf> {
    if agg.mode == WindowMode::Download {
        return Err(IngestError::Render(
            "download windows export CSV, they have no chart artifact".into(),
        ));
    }

    let traces = build_traces(schema, agg);
    let chart_layout = build_layout(schema, agg);

    let traces_json = serde_json::to_string(&traces)?;
    let layout_json = serde_json::to_string(&chart_layout)?;
    let html = ChartTemplate {
        title: &schema.name,
        traces: &traces_json,
        layout: &layout_json,
    }
    .render()
    .map_err(|e| IngestError::Render(e.to_string()))?;

    let path = layout.chart_path(agg.mode.dir_name(), &schema.name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, html)?;
    info!(
        graph = %schema.name,
        mode = agg.mode.dir_name(),
        series = traces.len(),
        "chart artifact written"
    );
    Ok(path)
}

fn build_traces(schema: &GraphSchema, agg: &Aggregation) -> Vec<Value> {
    let x: Vec<String> = agg
        .frame
        .timestamps
        .iter()
        .map(|ts| ts.format(STORED_TIME_FORMAT).to_string())
        .collect();

    // fallback colors for columns the configuration has not colored yet
    let fallback = assign_colors(schema.active_variables().count());

    let mut traces = Vec::new();
    for name in draw_order(&agg.frame, schema) {
        let Some(col) = agg.frame.column(&name) else {
            continue;
        };
        let Some((idx, var)) = schema
            .active_variables()
            .enumerate()
            .find(|(_, v)| v.name == name)
        else {
            continue;
        };
        let color = var.color.clone().unwrap_or_else(|| fallback[idx].clone());
        let y: Vec<Value> = col
            .values
            .iter()
            .map(|v| match v {
                Some(v) => json!(v),
                None => Value::Null,
            })
            .collect();
        traces.push(json!({
            "x": x,
            "y": y,
            "name": name,
            "mode": "lines",
            "line": {"color": color, "width": 2},
            "visible": if var.default { json!(true) } else { json!("legendonly") },
        }));
    }
    traces
}

fn build_layout(schema: &GraphSchema, agg: &Aggregation) -> Value {
    // rolling viewport pinned to the window, not the data's own min/max
    let span = agg
        .mode
        .span()
        .unwrap_or_else(|| agg.end - agg.begin);
    let x_range = [
        (agg.end - span).format(STORED_TIME_FORMAT).to_string(),
        agg.end.format(STORED_TIME_FORMAT).to_string(),
    ];
    json!({
        "title": schema.name,
        "showlegend": true,
        "plot_bgcolor": "white",
        "paper_bgcolor": "white",
        "xaxis": {
            "title": "Time",
            "range": x_range,
            "gridcolor": "grey",
            "showline": true,
            "linewidth": 1,
            "linecolor": "black",
            "mirror": true,
            "tickformat": "%d.%m.%Y",
        },
        "yaxis": {
            "gridcolor": "grey",
            "showline": true,
            "linewidth": 1,
            "linecolor": "black",
            "mirror": true,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sf_schema::{TimeColumn, VariableColumn};
    use sf_series::Frame;

    fn agg(mode: WindowMode) -> Aggregation {
        let mut frame = Frame::with_columns(["a"]);
        let d0 = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 12)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        frame.push_row(d0, &[Some(10.0)]);
        frame.push_row(d1, &[None]);
        Aggregation {
            frame,
            begin: d0,
            end: d1,
            mode,
        }
    }

    fn schema() -> GraphSchema {
        GraphSchema {
            name: "lvs".into(),
            time_format: "d.m.Y H:M".into(),
            time_columns: vec![TimeColumn {
                name: "Time".into(),
                use_flag: true,
            }],
            variables: vec![VariableColumn {
                default: false,
                color: Some("#FF0000".into()),
                ..VariableColumn::new("a")
            }],
        }
    }

    #[test]
    fn artifact_lands_in_the_per_mode_location() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let path = render_chart(&layout, &schema(), &agg(WindowMode::Recent)).unwrap();
        assert_eq!(path, layout.chart_path("recent", "lvs"));
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("#FF0000"));
        assert!(html.contains("legendonly"));
        assert!(html.contains("Plotly.newPlot"));
    }

    #[test]
    fn null_values_break_the_line() {
        let traces = build_traces(&schema(), &agg(WindowMode::Full));
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0]["y"][1], Value::Null);
    }

    #[test]
    fn x_range_is_pinned_to_the_window() {
        let layout_json = build_layout(&schema(), &agg(WindowMode::Recent));
        let range = &layout_json["xaxis"]["range"];
        assert_eq!(range[1], "2024-03-12 00:00:00");
        assert_eq!(range[0], "2024-03-09 00:00:00");
    }

    #[test]
    fn download_mode_has_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        assert!(matches!(
            render_chart(&layout, &schema(), &agg(WindowMode::Download)),
            Err(IngestError::Render(_))
        ));
    }
}
