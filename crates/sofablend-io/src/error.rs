//! Error types for sofablend-io.

use std::path::PathBuf;

use sofablend_core::{GraphError, ShapeError};
use thiserror::Error;

/// Result type for sofablend-io operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding, applying or baking simulation data.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing required key in a payload.
    #[error("missing required: {0}")]
    MissingRequired(String),

    /// Invalid data in a payload or a bake directory.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A selected data field does not exist on the simulation object.
    #[error("unable to find data field named '{field}' in '{path}'")]
    UnknownField { field: String, path: String },

    /// A selection rule carries an invalid path pattern.
    #[error("invalid path pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Geometry could not be built from a payload.
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    /// Structural scene-graph failure.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Bake directory without a readable `scene.json`.
    #[error("not a bake directory: {}", .0.display())]
    NotABake(PathBuf),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid-data error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}
