//! The `index` descriptor written into every tile-set directory.
//!
//! The descriptor is a flat list of `key=value` lines read by geogrid. Tile
//! dimensions and word size come from the tiling, everything else from a
//! per-dataset template. Georeferencing numbers are calibration literals and
//! are kept as strings so they are written exactly as declared.

use crate::translate::PixelType;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the descriptor inside a tile-set directory.
pub const INDEX_FILE: &str = "index";

/// Georeferencing of a regular lat/lon tile-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Georeference {
    #[serde(default = "default_projection")]
    pub projection: String,
    pub dx: String,
    pub dy: String,
    #[serde(default = "default_known")]
    pub known_x: String,
    #[serde(default = "default_known")]
    pub known_y: String,
    pub known_lat: String,
    pub known_lon: String,
}

fn default_projection() -> String {
    "regular_ll".to_string()
}

fn default_known() -> String {
    "1.0".to_string()
}

impl Georeference {
    /// Regular lat/lon georeference anchored at pixel (1, 1).
    pub fn regular_ll(dx: &str, dy: &str, known_lat: &str, known_lon: &str) -> Self {
        Self {
            projection: default_projection(),
            dx: dx.to_string(),
            dy: dy.to_string(),
            known_x: default_known(),
            known_y: default_known(),
            known_lat: known_lat.to_string(),
            known_lon: known_lon.to_string(),
        }
    }

    /// Same georeference with a different anchor longitude.
    pub fn with_known_lon(&self, known_lon: &str) -> Self {
        Self {
            known_lon: known_lon.to_string(),
            ..self.clone()
        }
    }
}

/// A named category code such as `iswater=17`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCategory {
    pub key: String,
    pub code: u32,
}

/// Byte order of multi-byte words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn as_str(&self) -> &'static str {
        match self {
            Endian::Little => "little",
            Endian::Big => "big",
        }
    }
}

/// Where `missing_value` sits in a continuous descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePosition {
    /// After `scale_factor` and `endian`.
    #[default]
    AfterScale,
    /// Right after `wordsize`, ahead of the tile geometry.
    AfterWordsize,
}

/// Categorical versus continuous value encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Encoding {
    /// Discrete class codes.
    Categorical {
        category_min: u32,
        category_max: u32,
        /// Land-use table name.
        #[serde(default)]
        mminlu: Option<String>,
        /// Named category codes, written after the description.
        #[serde(default)]
        special: Vec<SpecialCategory>,
    },
    /// Physically scaled measurements.
    Continuous {
        missing_value: String,
        scale_factor: String,
        #[serde(default)]
        endian: Option<Endian>,
        #[serde(default)]
        missing_value_position: MissingValuePosition,
    },
}

impl Encoding {
    fn type_name(&self) -> &'static str {
        match self {
            Encoding::Categorical { .. } => "categorical",
            Encoding::Continuous { .. } => "continuous",
        }
    }
}

/// Per-dataset part of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorTemplate {
    pub encoding: Encoding,
    pub georef: Georeference,
    /// Number of vertical levels (bands) per tile.
    #[serde(default = "default_tile_z")]
    pub tile_z: u32,
    pub units: String,
    pub description: String,
}

fn default_tile_z() -> u32 {
    1
}

/// A resolved descriptor: ordered `key=value` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    entries: Vec<(String, String)>,
}

impl Descriptor {
    /// Resolve a template against tile geometry and pixel type.
    pub fn new(
        template: &DescriptorTemplate,
        georef: &Georeference,
        tile_x: u32,
        tile_y: u32,
        pixel_type: PixelType,
    ) -> Self {
        let mut entries = Fields::default();
        entries.push("type", template.encoding.type_name().to_string());

        if let Encoding::Categorical {
            category_min,
            category_max,
            ..
        } = &template.encoding
        {
            entries.push("category_min", category_min.to_string());
            entries.push("category_max", category_max.to_string());
        }
        if pixel_type.is_signed() {
            entries.push("signed", "yes".to_string());
        }

        entries.push("projection", georef.projection.clone());
        entries.push("dx", georef.dx.clone());
        entries.push("dy", georef.dy.clone());
        entries.push("known_x", georef.known_x.clone());
        entries.push("known_y", georef.known_y.clone());
        entries.push("known_lat", georef.known_lat.clone());
        entries.push("known_lon", georef.known_lon.clone());
        entries.push("wordsize", pixel_type.word_size().to_string());
        if let Encoding::Continuous {
            missing_value,
            missing_value_position: MissingValuePosition::AfterWordsize,
            ..
        } = &template.encoding
        {
            entries.push("missing_value", missing_value.clone());
        }
        entries.push("tile_x", tile_x.to_string());
        entries.push("tile_y", tile_y.to_string());
        entries.push("tile_z", template.tile_z.to_string());

        if let Encoding::Continuous {
            missing_value,
            scale_factor,
            endian,
            missing_value_position,
        } = &template.encoding
        {
            entries.push("scale_factor", scale_factor.clone());
            if let Some(endian) = endian {
                entries.push("endian", endian.as_str().to_string());
            }
            if *missing_value_position == MissingValuePosition::AfterScale {
                entries.push("missing_value", missing_value.clone());
            }
        }

        entries.push("units", quoted(&template.units));
        entries.push("description", quoted(&template.description));

        if let Encoding::Categorical {
            mminlu, special, ..
        } = &template.encoding
        {
            if let Some(mminlu) = mminlu {
                entries.push("mminlu", quoted(mminlu));
            }
            for category in special {
                entries.push(category.key.clone(), category.code.to_string());
            }
        }

        Self { entries: entries.0 }
    }

    /// Value of a key, as written (string values include their quotes).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Keys in output order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Text of the descriptor: one `key=value` per line, no trailing newline.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write `dir/index`, replacing any previous descriptor.
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(INDEX_FILE);
        fs::write(&path, self.render())?;
        Ok(path)
    }
}

/// Special category keys geogrid understands.
pub const SPECIAL_CATEGORY_KEYS: [&str; 4] = ["iswater", "isice", "isurban", "islake"];

#[derive(Default)]
struct Fields(Vec<(String, String)>);

impl Fields {
    fn push(&mut self, key: impl Into<String>, value: String) {
        self.0.push((key.into(), value));
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value)
}
