//! The per-dataset pipeline: acquire, tile, clean, describe.

use crate::catalog::{DatasetSpec, TileSetPlan};
use crate::clean::clean_sidecars;
use crate::config::Config;
use crate::descriptor::Descriptor;
use crate::translate::{TranslateRequest, Translator};
use crate::Result;
use geogrid_fetch::{Acquisition, FetchErrorKind, Fetcher, Transport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What was produced for one tile-set directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSetReport {
    /// Tile-set directory.
    pub dir: PathBuf,
    /// Number of converter invocations issued.
    pub tiles: usize,
    /// Number of sidecar files removed afterwards.
    pub sidecars_removed: usize,
    /// Path of the written descriptor.
    pub descriptor: PathBuf,
}

/// What was produced for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetReport {
    /// Dataset name.
    pub name: String,
    /// Acquisition outcome, or the kind of failure that was tolerated.
    pub acquisition: std::result::Result<Acquisition, FetchErrorKind>,
    /// One entry per tile-set directory.
    pub tile_sets: Vec<TileSetReport>,
}

impl DatasetReport {
    /// Total converter invocations over all tile-sets.
    pub fn tiles(&self) -> usize {
        self.tile_sets.iter().map(|t| t.tiles).sum()
    }
}

/// Sequential builder of tile-sets.
pub struct Pipeline<T: Transport, X: Translator> {
    config: Config,
    fetcher: Fetcher<T>,
    translator: X,
}

impl<T: Transport, X: Translator> std::fmt::Debug for Pipeline<T, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher)
            .finish()
    }
}

impl<T: Transport, X: Translator> Pipeline<T, X> {
    /// Create a pipeline fetching through `transport` and converting through
    /// `translator`.
    pub fn new(config: Config, transport: T, translator: X) -> Self {
        let fetcher = Fetcher::new(transport, &config.staging_dir, config.remote.clone());
        Self {
            config,
            fetcher,
            translator,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the fetcher.
    pub fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    /// Get the translator.
    pub fn translator(&self) -> &X {
        &self.translator
    }

    /// Consume the pipeline, returning the translator.
    pub fn into_translator(self) -> X {
        self.translator
    }

    /// Build every dataset in order.
    pub fn run(&mut self, datasets: &[DatasetSpec]) -> Result<Vec<DatasetReport>> {
        datasets.iter().map(|d| self.run_dataset(d)).collect()
    }

    /// Build all tile-sets of one dataset.
    ///
    /// The definition is validated before anything is fetched or written. A
    /// failed acquisition is logged and tiling proceeds against whatever is on
    /// disk, unless the configuration is strict.
    pub fn run_dataset(&mut self, dataset: &DatasetSpec) -> Result<DatasetReport> {
        dataset.validate()?;
        let plans = dataset.tile_sets()?;
        info!("Building {} ({} tile-sets)", dataset.name, plans.len());

        let acquisition = match self.fetcher.ensure(&dataset.source) {
            Ok(acquisition) => Ok(acquisition),
            Err(e) if self.config.strict => return Err(e.into()),
            Err(e) => {
                warn!(
                    "Failed to acquire {} ({} error): {}",
                    dataset.source.name,
                    e.kind(),
                    e
                );
                Err(e.kind())
            }
        };

        let source = dataset
            .selector
            .render(&self.fetcher.local_path(&dataset.source));
        let dataset_dir = self.config.dataset_dir(&dataset.name);

        let mut tile_sets = Vec::with_capacity(plans.len());
        for plan in &plans {
            tile_sets.push(self.build_tile_set(dataset, &source, plan, &dataset_dir)?);
        }

        Ok(DatasetReport {
            name: dataset.name.clone(),
            acquisition,
            tile_sets,
        })
    }

    fn build_tile_set(
        &mut self,
        dataset: &DatasetSpec,
        source: &str,
        plan: &TileSetPlan,
        dataset_dir: &Path,
    ) -> Result<TileSetReport> {
        let dir = plan.dir(dataset_dir);
        fs::create_dir_all(&dir)?;

        let mut tiles = 0;
        for tile in plan.grid.tiles() {
            let request = TranslateRequest {
                output_type: dataset.pixel_type,
                rescale: dataset.rescale,
                window: tile,
                source: source.to_string(),
                destination: dir.join(plan.grid.file_name(&tile)),
            };
            debug!("Tile {}", request.destination.display());
            self.translator.translate(&request)?;
            tiles += 1;
        }

        let sidecars_removed = clean_sidecars(&dir)?;

        let tile_size = plan.grid.tile_size();
        let descriptor = Descriptor::new(
            &dataset.descriptor,
            &plan.georef,
            tile_size.cols,
            tile_size.rows,
            dataset.pixel_type,
        )
        .write(&dir)?;

        info!(
            "Wrote {} tiles to {} ({} sidecars removed)",
            tiles,
            dir.display(),
            sidecars_removed
        );

        Ok(TileSetReport {
            dir,
            tiles,
            sidecars_removed,
            descriptor,
        })
    }
}
