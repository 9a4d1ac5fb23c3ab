//! Dataset definitions.
//!
//! Every supported dataset is one declarative [`DatasetSpec`]. The built-in
//! catalog reproduces the UFS static-data tile-sets; a YAML file with the same
//! shape can replace it.

use crate::descriptor::{
    DescriptorTemplate, Encoding, Endian, Georeference, MissingValuePosition, SpecialCategory,
    SPECIAL_CATEGORY_KEYS,
};
use crate::grid::{GridSize, Hemisphere, TileGrid};
use crate::translate::{PixelType, Rescale, SourceSelector};
use crate::{Result, TileError};
use geogrid_fetch::SourceFile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Largest 1-based bound that fits the five-digit tile file names.
pub const MAX_TILESET_EXTENT: u32 = 99_999;

/// Per-half georeference overrides for a grid split at the prime meridian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HemisphereSplit {
    pub west_known_lon: String,
    pub east_known_lon: String,
}

impl HemisphereSplit {
    fn known_lon(&self, half: Hemisphere) -> &str {
        match half {
            Hemisphere::West => &self.west_known_lon,
            Hemisphere::East => &self.east_known_lon,
        }
    }
}

/// Declarative description of one tile-set product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Output directory name under the output root.
    pub name: String,
    /// Source file and its remote origin.
    pub source: SourceFile,
    /// Source raster size.
    pub grid: GridSize,
    /// Tile size.
    pub tile: GridSize,
    /// Output pixel type.
    pub pixel_type: PixelType,
    #[serde(default)]
    pub rescale: Option<Rescale>,
    #[serde(default)]
    pub selector: SourceSelector,
    /// Split into `west/` and `east/` tile-sets.
    #[serde(default)]
    pub split: Option<HemisphereSplit>,
    pub descriptor: DescriptorTemplate,
}

/// One directory worth of tiles planned for a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSetPlan {
    /// Subdirectory under the dataset directory, if any.
    pub subdir: Option<&'static str>,
    /// Tiling of the (part of the) source grid.
    pub grid: TileGrid,
    /// Georeference written to this tile-set's descriptor.
    pub georef: Georeference,
}

impl TileSetPlan {
    /// Output directory for this tile-set.
    pub fn dir(&self, dataset_dir: &Path) -> PathBuf {
        match self.subdir {
            Some(subdir) => dataset_dir.join(subdir),
            None => dataset_dir.to_path_buf(),
        }
    }
}

impl DatasetSpec {
    /// Tile-sets this dataset produces, in output order.
    pub fn tile_sets(&self) -> Result<Vec<TileSetPlan>> {
        match &self.split {
            None => Ok(vec![TileSetPlan {
                subdir: None,
                grid: TileGrid::new(self.grid, self.tile)?,
                georef: self.descriptor.georef.clone(),
            }]),
            Some(split) => Hemisphere::ALL
                .iter()
                .map(|&half| {
                    Ok(TileSetPlan {
                        subdir: Some(half.dir_name()),
                        grid: TileGrid::hemisphere(self.grid, self.tile, half)?,
                        georef: self.descriptor.georef.with_known_lon(split.known_lon(half)),
                    })
                })
                .collect(),
        }
    }

    /// Check that the definition is internally consistent.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| TileError::InvalidDataset {
            name: self.name.clone(),
            reason,
        };

        if self.name.is_empty() || self.name.contains(['/', '\\']) {
            return Err(invalid("name must be a single path component".to_string()));
        }

        let plans = self.tile_sets().map_err(|e| invalid(e.to_string()))?;
        for plan in &plans {
            let extent = plan.grid.extent();
            if extent.rows > MAX_TILESET_EXTENT || extent.cols > MAX_TILESET_EXTENT {
                return Err(invalid(format!(
                    "tile-set extent {} does not fit five-digit tile names",
                    extent
                )));
            }
        }

        match &self.descriptor.encoding {
            Encoding::Categorical {
                category_min,
                category_max,
                special,
                ..
            } => {
                if category_min > category_max {
                    return Err(invalid(format!(
                        "category_min {} exceeds category_max {}",
                        category_min, category_max
                    )));
                }
                if let Some(unknown) = special
                    .iter()
                    .find(|c| !SPECIAL_CATEGORY_KEYS.contains(&c.key.as_str()))
                {
                    return Err(invalid(format!("unknown special category {}", unknown.key)));
                }
            }
            Encoding::Continuous { .. } => {}
        }

        Ok(())
    }
}

/// Top-level shape of a catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub datasets: Vec<DatasetSpec>,
}

impl Catalog {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self {
            datasets: builtin_datasets(),
        }
    }

    /// Parse a catalog from YAML text.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self> {
        let catalog: Catalog = serde_yaml::from_str(text).map_err(|source| TileError::Yaml {
            path: origin.to_string(),
            source,
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text, &path.display().to_string())
    }

    /// Validate every dataset and check that names are unique.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for dataset in &self.datasets {
            dataset.validate()?;
            if !names.insert(dataset.name.as_str()) {
                return Err(TileError::InvalidDataset {
                    name: dataset.name.clone(),
                    reason: "duplicate name".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Look up a dataset by name.
    pub fn get(&self, name: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Datasets with the given names, in catalog order. An empty selection
    /// means every dataset.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<DatasetSpec>> {
        if let Some(unknown) = names.iter().find(|n| self.get(n.as_ref()).is_none()) {
            return Err(TileError::UnknownDataset(unknown.as_ref().to_string()));
        }
        Ok(self
            .datasets
            .iter()
            .filter(|d| names.is_empty() || names.iter().any(|n| n.as_ref() == d.name))
            .cloned()
            .collect())
    }
}

fn ll_30s() -> Georeference {
    Georeference::regular_ll("0.00833333", "-0.00833333", "89.99583", "-179.99583")
}

fn ll_0p05deg() -> Georeference {
    Georeference::regular_ll("0.05", "0.05", "-89.975", "-179.975")
}

fn soil_type_template() -> DescriptorTemplate {
    DescriptorTemplate {
        encoding: Encoding::Categorical {
            category_min: 1,
            category_max: 16,
            mminlu: None,
            special: Vec::new(),
        },
        georef: ll_30s(),
        tile_z: 1,
        units: "category".to_string(),
        description: "16-category top-layer soil type".to_string(),
    }
}

fn gmted_template(georef: Georeference, description: &str) -> DescriptorTemplate {
    DescriptorTemplate {
        encoding: Encoding::Continuous {
            missing_value: "-32768".to_string(),
            scale_factor: "1.0".to_string(),
            endian: Some(Endian::Little),
            missing_value_position: MissingValuePosition::AfterScale,
        },
        georef,
        tile_z: 1,
        units: "meters MSL".to_string(),
        description: description.to_string(),
    }
}

fn builtin_datasets() -> Vec<DatasetSpec> {
    let global_30s = GridSize::new(21600, 43200);
    let global_0p05 = GridSize::new(3600, 7200);

    vec![
        DatasetSpec {
            name: "ufs_viirs_landuse_20class_30s".to_string(),
            source: SourceFile::file("vegetation_type.viirs.v3.igbp.30s.nc"),
            grid: global_30s,
            tile: GridSize::square(1200),
            pixel_type: PixelType::Byte,
            rescale: None,
            selector: SourceSelector::Path,
            split: None,
            descriptor: DescriptorTemplate {
                encoding: Encoding::Categorical {
                    category_min: 1,
                    category_max: 20,
                    mminlu: Some("MODIFIED_IGBP_MODIS_NOAH".to_string()),
                    special: vec![
                        SpecialCategory {
                            key: "iswater".to_string(),
                            code: 17,
                        },
                        SpecialCategory {
                            key: "isice".to_string(),
                            code: 15,
                        },
                        SpecialCategory {
                            key: "isurban".to_string(),
                            code: 13,
                        },
                    ],
                },
                georef: ll_30s(),
                tile_z: 1,
                units: "category".to_string(),
                description: "Noah-modified 20-category IGBP-MODIS landuse".to_string(),
            },
        },
        DatasetSpec {
            name: "ufs_bnu_soiltype_30s".to_string(),
            source: SourceFile::file("soil_type.bnu.v3.30s.nc"),
            grid: global_30s,
            tile: GridSize::square(1200),
            pixel_type: PixelType::Byte,
            rescale: None,
            selector: SourceSelector::NetcdfVariable {
                variable: "soil_type".to_string(),
            },
            split: None,
            descriptor: soil_type_template(),
        },
        DatasetSpec {
            name: "ufs_statsgo_soiltype_30s".to_string(),
            source: SourceFile::file("soil_type.statsgo.v3.30s.nc"),
            grid: global_30s,
            tile: GridSize::square(1200),
            pixel_type: PixelType::Byte,
            rescale: None,
            selector: SourceSelector::Path,
            split: None,
            descriptor: soil_type_template(),
        },
        DatasetSpec {
            name: "ufs_maxsnowalb".to_string(),
            source: SourceFile::file("maximum_snow_albedo.0.05.nc"),
            grid: global_0p05,
            tile: GridSize::square(200),
            pixel_type: PixelType::Byte,
            rescale: Some(Rescale::new(0.0, 1.0, 0.0, 250.0)),
            selector: SourceSelector::Path,
            split: None,
            descriptor: DescriptorTemplate {
                encoding: Encoding::Continuous {
                    missing_value: "0".to_string(),
                    scale_factor: "0.4".to_string(),
                    endian: None,
                    missing_value_position: MissingValuePosition::AfterScale,
                },
                georef: ll_0p05deg(),
                tile_z: 1,
                units: "percent".to_string(),
                description: "MODIS maximum snow albedo".to_string(),
            },
        },
        DatasetSpec {
            // Near-IR white-sky albedo, not the total surface albedo
            name: "ufs_snowfreealb".to_string(),
            source: SourceFile::file("snowfree_albedo.4comp.0.05.nc"),
            grid: global_0p05,
            tile: GridSize::square(600),
            pixel_type: PixelType::UInt16,
            rescale: Some(Rescale::new(0.0, 1.0, 0.0, 64000.0)),
            selector: SourceSelector::NetcdfVariable {
                variable: "near_IR_white_sky_albedo".to_string(),
            },
            split: None,
            descriptor: DescriptorTemplate {
                encoding: Encoding::Continuous {
                    missing_value: "0".to_string(),
                    scale_factor: "0.0015625".to_string(),
                    endian: Some(Endian::Little),
                    missing_value_position: MissingValuePosition::AfterScale,
                },
                georef: ll_0p05deg(),
                tile_z: 12,
                units: "percent".to_string(),
                description: "Monthly MODIS surface albedo".to_string(),
            },
        },
        DatasetSpec {
            name: "ufs_lai_pnnl_30s".to_string(),
            source: SourceFile::file("LAI_climo_pnnl.nc"),
            grid: global_30s,
            tile: GridSize::square(1200),
            pixel_type: PixelType::Byte,
            rescale: None,
            selector: SourceSelector::Path,
            split: None,
            descriptor: DescriptorTemplate {
                encoding: Encoding::Continuous {
                    missing_value: "0".to_string(),
                    scale_factor: "0.1".to_string(),
                    endian: None,
                    missing_value_position: MissingValuePosition::AfterWordsize,
                },
                georef: Georeference::regular_ll(
                    "0.00833333",
                    "-0.00833333",
                    "89.995833",
                    "-179.995833",
                ),
                tile_z: 12,
                units: "m^2/m^2".to_string(),
                description: "MODIS LAI".to_string(),
            },
        },
        DatasetSpec {
            name: "topo_gmted2010_30s".to_string(),
            source: SourceFile::archive("mn30_grd", "mn30_grd.zip"),
            grid: GridSize::new(16800, 43200),
            tile: GridSize::square(1200),
            pixel_type: PixelType::Int16,
            rescale: None,
            selector: SourceSelector::Path,
            split: None,
            descriptor: gmted_template(
                Georeference::regular_ll("0.00833333", "-0.00833333", "83.995833", "-179.995833"),
                "GMTED2010 30-arc-second topography height",
            ),
        },
        DatasetSpec {
            // 172800 columns do not fit five-digit tile names, so each
            // hemisphere is its own tile-set
            name: "topo_gmted2010_7p5s".to_string(),
            source: SourceFile::archive("mn75_grd", "mn75_grd.zip"),
            grid: GridSize::new(67200, 172800),
            tile: GridSize::square(1200),
            pixel_type: PixelType::Int16,
            rescale: None,
            selector: SourceSelector::Path,
            split: Some(HemisphereSplit {
                west_known_lon: "-179.998958".to_string(),
                east_known_lon: "0.001041667".to_string(),
            }),
            descriptor: gmted_template(
                Georeference::regular_ll("0.002083333", "-0.002083333", "83.998958", "-179.998958"),
                "GMTED2010 7.5-arc-second topography height",
            ),
        },
    ]
}
