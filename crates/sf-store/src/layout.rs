//! On-disk layout for partitions and chart artifacts.
//!
//! ```text
//! <root>/proc_data/<graph>/<YYYY>_<MM>.csv      one month of one graph
//! <root>/graphs/{full|recent}/graph_<graph>.html  rendered artifacts
//! ```
//!
//! Partition filenames are zero-padded so plain lexical order is
//! chronological order; the range selector relies on that.

use std::fs;
use std::path::{Path, PathBuf};

use sf_common::Result;

/// Path builder rooted at one data directory.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one graph's partitions.
    pub fn graph_dir(&self, graph: &str) -> PathBuf {
        self.root.join("proc_data").join(graph)
    }

    /// Partition file for one (graph, year, month).
    pub fn partition_path(&self, graph: &str, year: i32, month: u32) -> PathBuf {
        self.graph_dir(graph)
            .join(format!("{year}_{month:02}.csv"))
    }

    /// Chart artifact for one (graph, window mode).
    pub fn chart_path(&self, mode: &str, graph: &str) -> PathBuf {
        self.root
            .join("graphs")
            .join(mode)
            .join(format!("graph_{graph}.html"))
    }

    /// Existing partition files for a graph, in chronological order.
    /// An absent graph directory yields an empty list, not an error.
    pub fn list_partitions(&self, graph: &str) -> Result<Vec<PathBuf>> {
        let dir = self.graph_dir(graph);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Remove a graph's partitions and artifacts (instrument deletion).
    pub fn remove_graph(&self, graph: &str) -> Result<()> {
        let dir = self.graph_dir(graph);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        for mode in ["full", "recent"] {
            let chart = self.chart_path(mode, graph);
            if chart.exists() {
                fs::remove_file(&chart)?;
            }
        }
        Ok(())
    }
}
