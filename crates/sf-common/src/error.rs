//! Error types for the Sensorfleet ingestion pipeline.

use thiserror::Error;

/// Result type alias for Sensorfleet operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Unified error type for the ingestion pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    // Schema errors (10-19)
    #[error("schema error for graph '{graph}': {reason}")]
    Schema { graph: String, reason: String },

    #[error("columns declared for graph '{graph}' missing from raw header: {missing:?}")]
    ColumnMismatch { graph: String, missing: Vec<String> },

    #[error("graph '{graph}': value '{value}' does not match time format '{format}'")]
    TimeFormat {
        graph: String,
        value: String,
        format: String,
    },

    // Storage errors (20-29)
    #[error("no partitions stored for graph '{graph}'")]
    NoData { graph: String },

    // Transport errors (30-39)
    #[error("remote fetch failed: {0}")]
    Transport(String),

    // Render errors (40-49)
    #[error("chart render failed: {0}")]
    Render(String),

    // I/O and codec errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// Returns the stable error code for this error type.
    /// Used for detailed error reporting in logs and CLI exit paths.
    pub fn code(&self) -> u32 {
        match self {
            IngestError::Schema { .. } => 10,
            IngestError::ColumnMismatch { .. } => 11,
            IngestError::TimeFormat { .. } => 12,
            IngestError::NoData { .. } => 20,
            IngestError::Transport(_) => 30,
            IngestError::Render(_) => 40,
            IngestError::Io(_) => 60,
            IngestError::Csv(_) => 61,
            IngestError::Json(_) => 62,
        }
    }

    /// Whether an unattended (scheduled) caller should swallow this error,
    /// log it, and continue with the remaining instruments in the cycle.
    ///
    /// User-driven calls always surface these so the upload form can show
    /// an actionable message instead of silently dropping the file.
    pub fn recoverable_in_background(&self) -> bool {
        matches!(
            self,
            IngestError::ColumnMismatch { .. }
                | IngestError::TimeFormat { .. }
                | IngestError::Transport(_)
        )
    }
}
