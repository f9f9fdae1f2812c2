#![allow(
    clippy::needless_pass_by_value, // clap hands us owned values
    clippy::unnecessary_wraps,      // consistent Result return for command handlers
)]

//! Slicecost CLI - print metrics and cost estimation for sliced jobs
//!
//! Reads the 3MF archive and G-code files written by a slicing run and
//! prints the derived metrics as JSON on stdout. Logs go to stderr.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::{Config, DEFAULT_CONFIG};
use serde::Serialize;
use slicecost_core::{AnalysisOptions, AnalysisPipeline, CostModel, PlateCountPolicy};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    /// Only errors
    Quiet,
    /// Warnings and errors (default)
    Normal,
    /// Progress information
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Default `env_logger` filter; `RUST_LOG` still overrides it
    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "slicecost",
    about = "Print metrics and cost estimates for sliced 3MF jobs",
    long_about = "Derive bounding boxes, print time and filament usage from a slicer's\n\
                  exported 3MF archive and G-code output, and price the job.",
    version
)]
struct Args {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Config file applied on top of ~/.slicecost.toml and ./.slicecost.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Material overrides shared by `analyze` and `cost`
#[derive(clap::Args, Debug, Clone, Default)]
struct MaterialArgs {
    /// Filament density in g/cm3
    #[arg(long, value_name = "G_PER_CM3")]
    density: Option<f64>,

    /// Filament price per kilogram
    #[arg(long, value_name = "PRICE")]
    cost_per_kg: Option<f64>,

    /// Filament diameter in mm
    #[arg(long, value_name = "MM")]
    diameter: Option<f64>,
}

impl MaterialArgs {
    fn apply(&self, options: &mut AnalysisOptions) {
        if let Some(density) = self.density {
            options.material = options.material.clone().with_density(density);
        }
        if let Some(cost_per_kg) = self.cost_per_kg {
            options.material.cost_per_kg = cost_per_kg;
        }
        if let Some(diameter) = self.diameter {
            options.material.diameter = diameter;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a sliced job: bounding boxes, print time, filament usage
    #[command(long_about = "Analyze a sliced job.\n\
                      \n\
                      ARCHIVE is the 3MF exported by the slicer (Metadata/slice_info.config\n\
                      and Metadata/plate_<n>.json are read from it). OUTPUT_DIR holds the\n\
                      per-plate .gcode files; their 'total estimated time' annotations give\n\
                      the print duration.")]
    Analyze {
        /// Sliced 3MF archive
        archive: PathBuf,

        /// Directory containing the per-plate .gcode files
        output_dir: PathBuf,

        /// Include a cost breakdown
        #[arg(long)]
        cost: bool,

        #[command(flatten)]
        material: MaterialArgs,

        /// Warn instead of failing when plate and G-code counts differ
        #[arg(long)]
        lenient_plates: bool,

        /// Compact JSON output (no indentation)
        #[arg(long)]
        compact: bool,

        /// Write JSON to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Price a job from filament length and print time alone
    Cost {
        /// Filament length in meters
        #[arg(long = "length-m", value_name = "METERS")]
        length_m: f64,

        /// Print duration in seconds
        #[arg(long, value_name = "SECONDS")]
        seconds: u64,

        #[command(flatten)]
        material: MaterialArgs,

        /// Compact JSON output (no indentation)
        #[arg(long)]
        compact: bool,
    },

    /// Manage .slicecost.toml configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Create a .slicecost.toml with the built-in defaults
    Init {
        /// Create in the home directory instead of the current directory
        #[arg(long)]
        user: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration after layering
    Show,
}

fn main() {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(verbosity.log_filter()))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::resolve(args.config.as_deref())?;

    match args.command {
        Commands::Analyze {
            archive,
            output_dir,
            cost,
            material,
            lenient_plates,
            compact,
            output,
        } => {
            let mut options = config.analysis_options();
            options.include_cost |= cost;
            if lenient_plates {
                options.plate_count_policy = PlateCountPolicy::Lenient;
            }
            material.apply(&mut options);

            let result = AnalysisPipeline::new(options)
                .analyze(&archive, &output_dir)
                .with_context(|| format!("Failed to analyze {}", archive.display()))?;

            write_json(&result, compact, output.as_deref())
        }

        Commands::Cost {
            length_m,
            seconds,
            material,
            compact,
        } => {
            let mut options = config.analysis_options();
            material.apply(&mut options);

            let breakdown = CostModel::new(options.rates)
                .breakdown(length_m, seconds, &options.material)
                .context("Failed to compute cost")?;

            write_json(&breakdown, compact, None)
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { user, force } => {
                let path = if user {
                    Config::user_config_path().context("Could not determine home directory")?
                } else {
                    Config::project_config_path()
                };
                init_config(&path, force)
            }
            ConfigAction::Show => {
                let rendered = Config::render_effective(&config.analysis_options())?;
                print!("{rendered}");
                Ok(())
            }
        },
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("{} Created {}", "✓".green().bold(), path.display());
    Ok(())
}

fn write_json<T: Serialize>(value: &T, compact: bool, output: Option<&Path>) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("Failed to serialize result")?;

    match output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
