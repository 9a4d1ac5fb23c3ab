//! # geogrid-fetch
//!
//! Acquisition of the global source rasters used to build geogrid static data.
//!
//! Sources are staged in a local directory and fetched only when missing:
//! - Surface climatology NetCDF files are copied from the NOAA S3 bucket
//! - GMTED2010 topography grids are fetched as zip archives from USGS and unpacked
//!
//! Nothing is retried and nothing is verified. A failed acquisition is
//! reported as a [`FetchError`] whose [`FetchErrorKind`] lets the caller decide
//! whether to keep going.
//!
//! ## Example
//!
//! ```no_run
//! use geogrid_fetch::{Fetcher, RemoteConfig, SourceFile};
//!
//! let mut fetcher = Fetcher::http("./ufs_static", RemoteConfig::default())?;
//! let outcome = fetcher.ensure(&SourceFile::file("maximum_snow_albedo.0.05.nc"))?;
//! println!("source at {}", outcome.path().display());
//! # Ok::<(), geogrid_fetch::FetchError>(())
//! ```

mod error;
mod fetcher;

pub use error::{FetchError, FetchErrorKind};
pub use fetcher::{
    Acquisition, DownloadStats, Fetcher, HttpTransport, Remote, RemoteConfig, SourceFile,
    Transport, CLIMO_BASE_URL, TOPO_BASE_URL,
};

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
