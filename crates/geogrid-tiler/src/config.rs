//! Run configuration.

use crate::translate::DEFAULT_PROGRAM;
use crate::{Result, TileError};
use geogrid_fetch::RemoteConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default local directory for downloaded sources.
pub const DEFAULT_STAGING_DIR: &str = "./ufs_static";

/// Default root under which tile-set directories are created.
pub const DEFAULT_OUTPUT_ROOT: &str = "./geog";

/// Everything a pipeline run needs besides the dataset definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where source files are downloaded to and read from.
    pub staging_dir: PathBuf,
    /// Root of the output tree.
    pub output_root: PathBuf,
    /// Remote endpoints.
    pub remote: RemoteConfig,
    /// Converter executable.
    pub converter: String,
    /// Abort the run when a source cannot be acquired.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            remote: RemoteConfig::default(),
            converter: DEFAULT_PROGRAM.to_string(),
            strict: false,
        }
    }
}

impl Config {
    /// Parse a configuration from YAML text. Missing keys take their defaults.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|source| TileError::Yaml {
            path: origin.to_string(),
            source,
        })
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text, &path.display().to_string())
    }

    /// Output directory of a dataset.
    pub fn dataset_dir(&self, name: &str) -> PathBuf {
        self.output_root.join(name)
    }
}
