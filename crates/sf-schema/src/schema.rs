//! Typed per-graph column configuration.
//!
//! A `GraphSchema` is the strongly-typed value object handed to every chain
//! invocation. It is read-only to the pipeline; mutation happens in the
//! external configuration layer that owns the metadata store.

use serde::{Deserialize, Serialize};
use sf_common::{IngestError, Result};

use crate::format::{expand_format, EPOCH_SENTINEL};

fn default_true() -> bool {
    true
}

fn default_coefficient() -> f64 {
    1.0
}

/// One selectable data series within a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableColumn {
    pub name: String,

    /// Included in processing at all.
    #[serde(rename = "use", default = "default_true")]
    pub use_flag: bool,

    /// Initially visible in the rendered legend.
    #[serde(default)]
    pub default: bool,

    /// Display color as `#RRGGBB`; assigned on first discovery if absent.
    #[serde(default)]
    pub color: Option<String>,

    /// Unit-rescaling multiplier applied at render time, never at rest.
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,
}

impl VariableColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_flag: true,
            default: false,
            color: None,
            coefficient: 1.0,
        }
    }
}

/// A candidate timestamp-source column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeColumn {
    pub name: String,

    #[serde(rename = "use", default = "default_true")]
    pub use_flag: bool,
}

/// How the active time column's values are to be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSpec {
    /// Integer seconds since the Unix epoch.
    EpochSeconds,
    /// A chrono strftime pattern (already expanded from compact notation).
    Pattern(String),
}

/// Full column configuration for one renderable series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSchema {
    /// Stable name; doubles as the partition-directory key.
    pub name: String,

    /// Compact time-format pattern, e.g. `d.m.Y H:M:S`.
    /// Ignored when the active time column is the epoch sentinel.
    #[serde(default)]
    pub time_format: String,

    #[serde(default)]
    pub time_columns: Vec<TimeColumn>,

    #[serde(default)]
    pub variables: Vec<VariableColumn>,
}

impl GraphSchema {
    /// The single active time column.
    ///
    /// Exactly one time column must have `use = true`; anything else is a
    /// configuration error upstream of the pipeline, reported as such.
    pub fn active_time_column(&self) -> Result<&TimeColumn> {
        let mut active = self.time_columns.iter().filter(|t| t.use_flag);
        match (active.next(), active.next()) {
            (Some(col), None) => Ok(col),
            (None, _) => Err(IngestError::Schema {
                graph: self.name.clone(),
                reason: "no active time column".into(),
            }),
            (Some(_), Some(_)) => Err(IngestError::Schema {
                graph: self.name.clone(),
                reason: "more than one active time column".into(),
            }),
        }
    }

    /// Active variable columns, in configured order.
    pub fn active_variables(&self) -> impl Iterator<Item = &VariableColumn> {
        self.variables.iter().filter(|v| v.use_flag)
    }

    /// Names of the active variable columns, in configured order.
    pub fn active_variable_names(&self) -> Vec<String> {
        self.active_variables().map(|v| v.name.clone()).collect()
    }

    /// Resolve how timestamps in this graph's raw files are parsed.
    pub fn time_spec(&self) -> Result<TimeSpec> {
        let time_col = self.active_time_column()?;
        if time_col.name == EPOCH_SENTINEL {
            return Ok(TimeSpec::EpochSeconds);
        }
        if self.time_format.is_empty() {
            return Err(IngestError::Schema {
                graph: self.name.clone(),
                reason: "empty time format pattern".into(),
            });
        }
        Ok(TimeSpec::Pattern(expand_format(&self.time_format)))
    }

    /// Validate the schema as a whole.
    pub fn validate(&self) -> Result<()> {
        self.time_spec()?;
        if self.active_variables().next().is_none() {
            return Err(IngestError::Schema {
                graph: self.name.clone(),
                reason: "no active variable columns".into(),
            });
        }
        Ok(())
    }
}
