//! Error type for the runner.

use geogrid_fetch::FetchError;
use geogrid_tiler::TileError;
use thiserror::Error;

/// Anything that stops a run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration, catalog or tiling failure.
    #[error(transparent)]
    Tile(#[from] TileError),

    /// The HTTP client could not be set up.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
