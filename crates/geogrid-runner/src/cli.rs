//! Command-line interface: argument parsing and the `run` and `list` commands.

use crate::Result;
use clap::{Args, Parser, Subcommand};
use geogrid_fetch::{HttpTransport, Remote};
use geogrid_tiler::{
    Catalog, Config, DatasetReport, DatasetSpec, DryRun, GdalTranslate, Pipeline, Translator,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "geogrid-static")]
#[command(version, about = "Build geogrid static tile-sets from global source rasters")]
pub struct Cli {
    /// Log at debug level when RUST_LOG is not set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acquire the sources and build the tile-sets
    Run(RunArgs),
    /// Print the datasets of the catalog
    List(ListArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// YAML catalog used instead of the built-in datasets
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Build only this dataset (repeatable, default: all)
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Root directory of the tile-sets
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Directory for downloaded sources
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Abort when a source cannot be acquired
    #[arg(long)]
    pub strict: bool,

    /// Log converter command lines instead of running them (sources are still
    /// downloaded and index files still written)
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// YAML catalog used instead of the built-in datasets
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

impl RunArgs {
    /// Configuration file (or defaults) with the command-line overrides applied.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &self.output_root {
            config.output_root = dir.clone();
        }
        if let Some(dir) = &self.staging_dir {
            config.staging_dir = dir.clone();
        }
        if self.strict {
            config.strict = true;
        }
        Ok(config)
    }

    /// Datasets to build, in catalog order.
    pub fn resolve_datasets(&self) -> Result<Vec<DatasetSpec>> {
        let catalog = load_catalog(self.catalog.as_deref())?;
        Ok(catalog.select(&self.only)?)
    }
}

/// Built-in catalog, or the one at `path`. Either way it is validated.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let catalog = match path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(),
    };
    catalog.validate()?;
    Ok(catalog)
}

/// Totals over a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub datasets: usize,
    pub tile_sets: usize,
    pub tiles: usize,
    pub sidecars_removed: usize,
    /// Datasets whose source could not be acquired.
    pub failed_acquisitions: usize,
    pub files_downloaded: usize,
    pub bytes_downloaded: u64,
}

impl RunSummary {
    pub fn from_reports(reports: &[DatasetReport]) -> Self {
        let mut summary = Self {
            datasets: reports.len(),
            ..Self::default()
        };
        for report in reports {
            if report.acquisition.is_err() {
                summary.failed_acquisitions += 1;
            }
            summary.tile_sets += report.tile_sets.len();
            summary.tiles += report.tiles();
            summary.sidecars_removed += report
                .tile_sets
                .iter()
                .map(|t| t.sidecars_removed)
                .sum::<usize>();
        }
        summary
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} datasets, {} tile-sets, {} tiles, {} sidecars removed, {} files downloaded ({} bytes)",
            self.datasets,
            self.tile_sets,
            self.tiles,
            self.sidecars_removed,
            self.files_downloaded,
            self.bytes_downloaded
        )?;
        if self.failed_acquisitions > 0 {
            write!(f, ", {} sources missing", self.failed_acquisitions)?;
        }
        Ok(())
    }
}

/// Execute the parsed command line.
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => run(&args).map(|_| ()),
        Command::List(args) => {
            let catalog = load_catalog(args.catalog.as_deref())?;
            for dataset in &catalog.datasets {
                println!("{}", describe(dataset));
            }
            Ok(())
        }
    }
}

/// The `run` command.
pub fn run(args: &RunArgs) -> Result<RunSummary> {
    let config = args.resolve_config()?;
    let datasets = args.resolve_datasets()?;
    info!(
        "Building {} datasets into {}",
        datasets.len(),
        config.output_root.display()
    );

    if args.dry_run {
        let translator = DryRun::new(config.converter.clone());
        let (summary, translator) = build(config, &datasets, translator)?;
        info!("Dry run issued {} commands", translator.issued());
        Ok(summary)
    } else {
        let translator = GdalTranslate::new(config.converter.clone());
        let (summary, translator) = build(config, &datasets, translator)?;
        if translator.failures() > 0 {
            warn!("{} converter invocations failed", translator.failures());
        }
        Ok(summary)
    }
}

fn build<X: Translator>(
    config: Config,
    datasets: &[DatasetSpec],
    translator: X,
) -> Result<(RunSummary, X)> {
    let mut pipeline = Pipeline::new(config, HttpTransport::new()?, translator);
    let reports = pipeline.run(datasets)?;

    let stats = pipeline.fetcher().download_stats();
    let summary = RunSummary {
        files_downloaded: stats.files_downloaded,
        bytes_downloaded: stats.bytes_downloaded,
        ..RunSummary::from_reports(&reports)
    };
    info!("Done: {}", summary);

    Ok((summary, pipeline.into_translator()))
}

/// One line of `list` output.
pub fn describe(dataset: &DatasetSpec) -> String {
    let source = match &dataset.source.remote {
        Remote::File => dataset.source.name.clone(),
        Remote::Archive { archive } => format!("{} (from {})", dataset.source.name, archive),
    };
    let layout = if dataset.split.is_some() {
        "west+east"
    } else {
        "single"
    };
    format!(
        "{:<32} {:>12} tile {:<10} {:<7} {:<10} {}",
        dataset.name,
        dataset.grid.to_string(),
        dataset.tile.to_string(),
        dataset.pixel_type.to_string(),
        layout,
        source
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "geogrid-static",
            "run",
            "--only",
            "ufs_maxsnowalb",
            "--only",
            "ufs_snowfreealb",
            "--output-root",
            "/data/geog",
            "--strict",
            "--dry-run",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.only, vec!["ufs_maxsnowalb", "ufs_snowfreealb"]);
        assert_eq!(args.output_root, Some(PathBuf::from("/data/geog")));
        assert!(args.strict);
        assert!(args.dry_run);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from(["geogrid-static", "-v", "list"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::List(ListArgs { catalog: None })));
    }

    #[test]
    fn test_dry_run_help_mentions_side_effects() {
        use clap::CommandFactory;

        let mut command = Cli::command();
        let run = command.find_subcommand_mut("run").unwrap();
        let help = run
            .get_arguments()
            .find(|arg| arg.get_id() == "dry_run")
            .and_then(|arg| arg.get_help())
            .unwrap()
            .to_string();
        assert!(help.contains("still downloaded"));
        assert!(help.contains("index files still written"));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["geogrid-static", "run", "--fast"]).is_err());
    }

    #[test]
    fn test_defaults_without_flags() {
        let args = RunArgs::default();
        assert_eq!(args.resolve_config().unwrap(), Config::default());
        assert_eq!(args.resolve_datasets().unwrap().len(), 8);
    }

    #[test]
    fn test_overrides_applied() {
        let args = RunArgs {
            staging_dir: Some(PathBuf::from("/tmp/staging")),
            strict: true,
            ..RunArgs::default()
        };
        let config = args.resolve_config().unwrap();
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/staging"));
        assert_eq!(config.output_root, Config::default().output_root);
        assert!(config.strict);
    }

    #[test]
    fn test_unknown_dataset_rejected() {
        let args = RunArgs {
            only: vec!["ufs_nothing".to_string()],
            ..RunArgs::default()
        };
        assert!(args.resolve_datasets().is_err());
    }

    #[test]
    fn test_describe() {
        let catalog = Catalog::builtin();
        let line = describe(catalog.get("topo_gmted2010_7p5s").unwrap());
        assert!(line.starts_with("topo_gmted2010_7p5s"));
        assert!(line.contains("67200x172800"));
        assert!(line.contains("west+east"));
        assert!(line.ends_with("mn75_grd (from mn75_grd.zip)"));

        let line = describe(catalog.get("ufs_maxsnowalb").unwrap());
        assert!(line.contains("Byte"));
        assert!(line.ends_with("maximum_snow_albedo.0.05.nc"));
    }
}
