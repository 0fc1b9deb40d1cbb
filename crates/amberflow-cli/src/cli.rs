use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "amberflow contributors",
    version,
    about = "amberflow - Run solvated protein MD pipelines (preparation, minimization, heating, equilibration, production) with the Amber tools.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: prep, two minimizations, heating, equilibration and production.
    Run(SimulationArgs),
    /// Write every stage's input deck into a new run directory without executing anything.
    Generate(SimulationArgs),
    /// Build the solvated, neutralized system and its topology only.
    Prepare(SimulationArgs),
}

/// Parameters shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct SimulationArgs {
    /// Input protein structure in PDB format.
    #[arg(required = true, value_name = "PDB")]
    pub structure: PathBuf,

    /// Production simulation time in nanoseconds (default: 10).
    #[arg(short = 't', long = "sim-time", value_name = "NS")]
    pub sim_time_ns: Option<f64>,

    /// Target temperature in Kelvin (default: 300).
    #[arg(short = 'T', long = "temperature", value_name = "K")]
    pub temperature_k: Option<f64>,

    /// Solvent box buffer around the solute in Angstrom (default: 12).
    #[arg(short = 'b', long = "box-buffer", value_name = "ANGSTROM")]
    pub box_buffer_angstrom: Option<f64>,

    /// Protein force field: ff14SB or ff19SB (default: ff19SB).
    #[arg(short = 'f', long = "force-field", value_name = "NAME")]
    pub force_field: Option<String>,

    /// Water model: tip3p, opc or tip4pew (default: opc).
    #[arg(short = 'w', long = "water-model", value_name = "NAME")]
    pub water_model: Option<String>,

    /// CUDA device to run on, as 'cuda:N' or 'N'. Omit to run on the CPU.
    #[arg(short = 'g', long = "gpu", value_name = "DEVICE")]
    pub gpu_device: Option<String>,

    /// Run directory to create. Must not exist yet.
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Job name used in the generated run directory name (default: structure file stem).
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub job_name: Option<String>,

    /// Shell-style environment file to read (not execute), e.g. $AMBERHOME/amber.sh.
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Parent directory for generated run directories (default: ./results).
    #[arg(long, value_name = "DIR")]
    pub results_root: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S simulation.temperature-k=310
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,

    /// Print the run report as JSON instead of a human-readable summary.
    #[arg(long)]
    pub json: bool,
}
