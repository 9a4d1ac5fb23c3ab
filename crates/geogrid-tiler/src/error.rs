//! Error types for the tiler crate.

use geogrid_fetch::FetchError;
use thiserror::Error;

/// Errors that can occur while building tile-sets.
#[derive(Debug, Error)]
pub enum TileError {
    /// I/O error on the output tree.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tile size is zero or does not evenly divide the grid.
    #[error("Tile {tile_rows}x{tile_cols} does not evenly divide grid {rows}x{cols}")]
    UnevenGrid {
        /// Grid rows.
        rows: u32,
        /// Grid columns.
        cols: u32,
        /// Tile rows.
        tile_rows: u32,
        /// Tile columns.
        tile_cols: u32,
    },

    /// The converter program could not be started.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A dataset definition is inconsistent.
    #[error("Invalid dataset {name}: {reason}")]
    InvalidDataset {
        /// Dataset name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A requested dataset is not in the catalog.
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// Catalog or configuration file could not be parsed.
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        /// File being parsed.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Acquisition failed and the pipeline runs in strict mode.
    #[error("Acquisition failed: {0}")]
    Fetch(#[from] FetchError),
}
