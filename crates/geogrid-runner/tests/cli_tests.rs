//! Tests for the runner against catalog and configuration files on disk.

use geogrid_runner::cli::{load_catalog, RunArgs, RunSummary};
use geogrid_runner::RunnerError;
use geogrid_tiler::TileError;
use std::fs;

const CATALOG: &str = "
datasets:
  - name: tiny_albedo
    source:
      name: tiny.nc
      remote:
        kind: file
    grid: { rows: 100, cols: 200 }
    tile: { rows: 100, cols: 100 }
    pixel_type: Byte
    rescale: null
    selector:
      kind: path
    split: null
    descriptor:
      encoding:
        type: continuous
        missing_value: \"0\"
        scale_factor: \"0.4\"
      georef:
        dx: \"1.8\"
        dy: \"1.8\"
        known_lat: \"-89.1\"
        known_lon: \"-179.1\"
      units: percent
      description: tiny albedo
";

#[test]
fn test_catalog_file_replaces_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.yaml");
    fs::write(&path, CATALOG).unwrap();

    let catalog = load_catalog(Some(&path)).unwrap();
    assert_eq!(catalog.datasets.len(), 1);
    assert_eq!(catalog.datasets[0].name, "tiny_albedo");

    let args = RunArgs {
        catalog: Some(path),
        only: vec!["ufs_maxsnowalb".to_string()],
        ..RunArgs::default()
    };
    let err = args.resolve_datasets().unwrap_err();
    assert!(matches!(err, RunnerError::Tile(TileError::UnknownDataset(ref n)) if n == "ufs_maxsnowalb"));
}

#[test]
fn test_config_file_with_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "staging_dir: /srv/staging\noutput_root: /srv/geog\nconverter: /opt/gdal/bin/gdal_translate\n",
    )
    .unwrap();

    let args = RunArgs {
        config: Some(path),
        output_root: Some(dir.path().join("out")),
        ..RunArgs::default()
    };
    let config = args.resolve_config().unwrap();
    assert_eq!(config.staging_dir, std::path::PathBuf::from("/srv/staging"));
    assert_eq!(config.output_root, dir.path().join("out"));
    assert_eq!(config.converter, "/opt/gdal/bin/gdal_translate");
    assert!(!config.strict);
}

#[test]
fn test_missing_config_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let args = RunArgs {
        config: Some(dir.path().join("absent.yaml")),
        ..RunArgs::default()
    };
    assert!(matches!(
        args.resolve_config(),
        Err(RunnerError::Tile(TileError::Io(_)))
    ));
}

#[test]
fn test_dry_run_with_staged_source() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("catalog.yaml");
    fs::write(&catalog, CATALOG).unwrap();
    let staging = dir.path().join("staging");
    fs::create_dir_all(&staging).unwrap();
    fs::write(staging.join("tiny.nc"), b"source").unwrap();

    let args = RunArgs {
        catalog: Some(catalog),
        staging_dir: Some(staging),
        output_root: Some(dir.path().join("geog")),
        dry_run: true,
        ..RunArgs::default()
    };
    let summary = geogrid_runner::cli::run(&args).unwrap();

    assert_eq!(
        summary,
        RunSummary {
            datasets: 1,
            tile_sets: 1,
            tiles: 2,
            ..RunSummary::default()
        }
    );
    let index = fs::read_to_string(dir.path().join("geog/tiny_albedo/index")).unwrap();
    assert!(index.starts_with("type=continuous\n"));
    assert!(index.contains("\ntile_x=100\ntile_y=100\n"));
}
