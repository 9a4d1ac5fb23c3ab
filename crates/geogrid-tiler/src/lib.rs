//! # geogrid-tiler
//!
//! Re-tiling of global rasters into geogrid binary tile-sets.
//!
//! Each dataset in the [`Catalog`] is built by the same [`Pipeline`]:
//!
//! 1. Acquire the source file into the staging directory (see `geogrid-fetch`)
//! 2. Cut the source grid into fixed-size windows and convert each with the
//!    external raster tool
//! 3. Remove the sidecar files the tool leaves behind
//! 4. Write the `index` descriptor
//!
//! ## Example
//!
//! ```no_run
//! use geogrid_fetch::HttpTransport;
//! use geogrid_tiler::{Catalog, Config, GdalTranslate, Pipeline};
//!
//! let config = Config::default();
//! let translator = GdalTranslate::new(config.converter.clone());
//! let mut pipeline = Pipeline::new(config, HttpTransport::new()?, translator);
//!
//! let datasets = Catalog::builtin().select(&["ufs_maxsnowalb"])?;
//! for report in pipeline.run(&datasets)? {
//!     println!("{}: {} tiles", report.name, report.tiles());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod clean;
pub mod config;
pub mod descriptor;
mod error;
pub mod grid;
pub mod pipeline;
pub mod translate;

pub use catalog::{Catalog, DatasetSpec, HemisphereSplit, TileSetPlan};
pub use clean::clean_sidecars;
pub use config::Config;
pub use descriptor::{
    Descriptor, DescriptorTemplate, Encoding, Endian, Georeference, MissingValuePosition,
};
pub use error::TileError;
pub use grid::{GridSize, Hemisphere, Tile, TileGrid};
pub use pipeline::{DatasetReport, Pipeline, TileSetReport};
pub use translate::{
    DryRun, GdalTranslate, PixelType, Rescale, SourceSelector, TranslateRequest, Translator,
};

/// Result type for tiling operations.
pub type Result<T> = std::result::Result<T, TileError>;
