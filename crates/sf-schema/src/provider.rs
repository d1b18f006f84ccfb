//! Schema provider contract and the JSON-file-backed implementation.
//!
//! The authoritative instrument metadata lives in an external store; the
//! pipeline only consumes a read view of it. `JsonSchemaProvider` covers
//! deployments (and tests) where that view is a single JSON map of
//! graph name to schema body.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sf_common::{IngestError, Result};

use crate::schema::{GraphSchema, TimeColumn, VariableColumn};

/// Read access to per-graph schemas, loaded fresh per chain invocation.
pub trait SchemaProvider {
    fn graph_schema(&self, graph: &str) -> Result<GraphSchema>;

    /// All instruments known to the provider, for poll/backfill cycles.
    fn instruments(&self) -> Result<Vec<Instrument>>;
}

/// One pollable instrument: a graph plus its remote folder link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub graph: String,
    pub link: String,
}

/// Schema body as stored in the JSON map (graph name is the map key).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaEntry {
    #[serde(default)]
    time_format: String,
    #[serde(default)]
    time_columns: Vec<TimeColumn>,
    #[serde(default)]
    variables: Vec<VariableColumn>,
    /// Remote folder link; absent for upload-only instruments.
    #[serde(default)]
    link: Option<String>,
}

/// Schema provider backed by one JSON file.
#[derive(Debug, Clone)]
pub struct JsonSchemaProvider {
    path: PathBuf,
}

impl JsonSchemaProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, SchemaEntry>> {
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl SchemaProvider for JsonSchemaProvider {
    fn graph_schema(&self, graph: &str) -> Result<GraphSchema> {
        let mut map = self.load()?;
        let entry = map.remove(graph).ok_or_else(|| IngestError::Schema {
            graph: graph.to_string(),
            reason: format!("not present in {}", self.path.display()),
        })?;
        let schema = GraphSchema {
            name: graph.to_string(),
            time_format: entry.time_format,
            time_columns: entry.time_columns,
            variables: entry.variables,
        };
        schema.validate()?;
        Ok(schema)
    }

    fn instruments(&self) -> Result<Vec<Instrument>> {
        Ok(self
            .load()?
            .into_iter()
            .filter_map(|(graph, entry)| entry.link.map(|link| Instrument { graph, link }))
            .collect())
    }
}

/// Write a schema map out as JSON, for fixtures and registration tooling.
pub fn write_schema_file(path: &Path, schemas: &[(GraphSchema, Option<String>)]) -> Result<()> {
    let map: BTreeMap<&str, SchemaEntry> = schemas
        .iter()
        .map(|(s, link)| {
            (
                s.name.as_str(),
                SchemaEntry {
                    time_format: s.time_format.clone(),
                    time_columns: s.time_columns.clone(),
                    variables: s.variables.clone(),
                    link: link.clone(),
                },
            )
        })
        .collect();
    fs::write(path, serde_json::to_string_pretty(&map)?)?;
    Ok(())
}
