//! Raster conversion through an external translation tool.
//!
//! Every tile is produced by one blocking `gdal_translate` call:
//!
//! ```text
//! gdal_translate -of ENVI -ot <type> [-scale a b c d] -srcwin x y w h <source> <dest>
//! ```
//!
//! A non-zero exit is logged and otherwise ignored; the tool prints its own
//! diagnostics to the inherited stdout/stderr.

use crate::grid::Tile;
use crate::{Result, TileError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// Output format of every tile: headerless band-sequential binary.
pub const OUTPUT_FORMAT: &str = "ENVI";

/// Default converter executable.
pub const DEFAULT_PROGRAM: &str = "gdal_translate";

/// Output pixel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelType {
    /// Unsigned 8-bit.
    Byte,
    /// Unsigned 16-bit.
    UInt16,
    /// Signed 16-bit.
    Int16,
}

impl PixelType {
    /// Name understood by the converter's `-ot` option.
    pub fn gdal_name(&self) -> &'static str {
        match self {
            PixelType::Byte => "Byte",
            PixelType::UInt16 => "UInt16",
            PixelType::Int16 => "Int16",
        }
    }

    /// Bytes per pixel.
    pub fn word_size(&self) -> u32 {
        match self {
            PixelType::Byte => 1,
            PixelType::UInt16 | PixelType::Int16 => 2,
        }
    }

    /// Whether values are signed.
    pub fn is_signed(&self) -> bool {
        matches!(self, PixelType::Int16)
    }
}

impl std::fmt::Display for PixelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.gdal_name())
    }
}

/// Linear value rescaling from `[src_min, src_max]` to `[dst_min, dst_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rescale {
    pub src_min: f64,
    pub src_max: f64,
    pub dst_min: f64,
    pub dst_max: f64,
}

impl Rescale {
    pub const fn new(src_min: f64, src_max: f64, dst_min: f64, dst_max: f64) -> Self {
        Self {
            src_min,
            src_max,
            dst_min,
            dst_max,
        }
    }
}

/// How the source file is referenced on the converter command line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSelector {
    /// The file itself (first or all bands).
    #[default]
    Path,
    /// One variable of a multi-variable NetCDF file.
    NetcdfVariable {
        /// Variable name.
        variable: String,
    },
}

impl SourceSelector {
    /// Render the source argument for a local file.
    pub fn render(&self, path: &Path) -> String {
        match self {
            SourceSelector::Path => path.display().to_string(),
            SourceSelector::NetcdfVariable { variable } => {
                format!("NETCDF:\"{}\":{}", path.display(), variable)
            }
        }
    }
}

/// One tile conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateRequest {
    /// Output pixel type.
    pub output_type: PixelType,
    /// Optional value rescaling.
    pub rescale: Option<Rescale>,
    /// Source pixel window.
    pub window: Tile,
    /// Rendered source argument.
    pub source: String,
    /// Output tile path.
    pub destination: PathBuf,
}

impl TranslateRequest {
    /// Converter arguments, program name excluded.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-of".to_string(),
            OUTPUT_FORMAT.to_string(),
            "-ot".to_string(),
            self.output_type.gdal_name().to_string(),
        ];
        if let Some(scale) = &self.rescale {
            args.push("-scale".to_string());
            args.extend(
                [scale.src_min, scale.src_max, scale.dst_min, scale.dst_max]
                    .iter()
                    .map(|v| v.to_string()),
            );
        }
        args.push("-srcwin".to_string());
        args.extend(
            [
                self.window.x,
                self.window.y,
                self.window.width,
                self.window.height,
            ]
            .iter()
            .map(|v| v.to_string()),
        );
        args.push(self.source.clone());
        args.push(self.destination.display().to_string());
        args
    }
}

/// Something that turns a [`TranslateRequest`] into a tile on disk.
pub trait Translator {
    /// Perform one conversion, blocking until it is done.
    fn translate(&mut self, request: &TranslateRequest) -> Result<()>;
}

/// Runs the external converter as a subprocess.
#[derive(Debug, Clone)]
pub struct GdalTranslate {
    program: String,
    failures: usize,
}

impl Default for GdalTranslate {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl GdalTranslate {
    /// Use the given executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            failures: 0,
        }
    }

    /// Number of invocations that exited unsuccessfully.
    pub fn failures(&self) -> usize {
        self.failures
    }
}

impl Translator for GdalTranslate {
    fn translate(&mut self, request: &TranslateRequest) -> Result<()> {
        let status = Command::new(&self.program)
            .args(request.args())
            .status()
            .map_err(|source| TileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            self.failures += 1;
            warn!(
                "{} exited with {} for {}",
                self.program,
                status,
                request.destination.display()
            );
        }
        Ok(())
    }
}

/// Logs the command lines instead of running them. The pipeline around it
/// still acquires sources and writes descriptors.
#[derive(Debug, Clone, Default)]
pub struct DryRun {
    program: String,
    issued: usize,
}

impl DryRun {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            issued: 0,
        }
    }

    /// Number of requests seen.
    pub fn issued(&self) -> usize {
        self.issued
    }
}

impl Translator for DryRun {
    fn translate(&mut self, request: &TranslateRequest) -> Result<()> {
        self.issued += 1;
        info!("{} {}", self.program, request.args().join(" "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Tile {
        Tile {
            x: 1200,
            y: 0,
            width: 1200,
            height: 1200,
        }
    }

    #[test]
    fn test_args_plain() {
        let request = TranslateRequest {
            output_type: PixelType::Byte,
            rescale: None,
            window: window(),
            source: "./ufs_static/vegetation_type.viirs.v3.igbp.30s.nc".to_string(),
            destination: PathBuf::from("out/01201-02400.00001-01200"),
        };
        assert_eq!(
            request.args(),
            vec![
                "-of",
                "ENVI",
                "-ot",
                "Byte",
                "-srcwin",
                "1200",
                "0",
                "1200",
                "1200",
                "./ufs_static/vegetation_type.viirs.v3.igbp.30s.nc",
                "out/01201-02400.00001-01200",
            ]
        );
    }

    #[test]
    fn test_args_rescaled() {
        let request = TranslateRequest {
            output_type: PixelType::UInt16,
            rescale: Some(Rescale::new(0.0, 1.0, 0.0, 64000.0)),
            window: Tile {
                x: 0,
                y: 600,
                width: 600,
                height: 600,
            },
            source: "src".to_string(),
            destination: PathBuf::from("dst"),
        };
        let args = request.args();
        assert_eq!(
            &args[..13],
            &["-of", "ENVI", "-ot", "UInt16", "-scale", "0", "1", "0", "64000", "-srcwin", "0", "600", "600"]
        );
    }

    #[test]
    fn test_source_selector() {
        let path = Path::new("./ufs_static/soil_type.bnu.v3.30s.nc");
        assert_eq!(SourceSelector::Path.render(path), "./ufs_static/soil_type.bnu.v3.30s.nc");
        let selector = SourceSelector::NetcdfVariable {
            variable: "soil_type".to_string(),
        };
        assert_eq!(
            selector.render(path),
            "NETCDF:\"./ufs_static/soil_type.bnu.v3.30s.nc\":soil_type"
        );
    }

    #[test]
    fn test_pixel_type() {
        assert_eq!(PixelType::Byte.word_size(), 1);
        assert_eq!(PixelType::UInt16.word_size(), 2);
        assert!(PixelType::Int16.is_signed());
        assert!(!PixelType::UInt16.is_signed());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut translator = GdalTranslate::new("definitely-not-a-real-gdal-translate");
        let request = TranslateRequest {
            output_type: PixelType::Byte,
            rescale: None,
            window: window(),
            source: "src".to_string(),
            destination: PathBuf::from("dst"),
        };
        assert!(matches!(
            translator.translate(&request),
            Err(TileError::Spawn { .. })
        ));
    }

    #[test]
    fn test_dry_run_counts() {
        let mut dry = DryRun::new(DEFAULT_PROGRAM);
        let request = TranslateRequest {
            output_type: PixelType::Byte,
            rescale: None,
            window: window(),
            source: "src".to_string(),
            destination: PathBuf::from("dst"),
        };
        dry.translate(&request).unwrap();
        dry.translate(&request).unwrap();
        assert_eq!(dry.issued(), 2);
    }
}
