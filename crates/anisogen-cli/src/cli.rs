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
    author = "anisogen contributors",
    version,
    about = "anisogen - Genetic search for metal-complex ligand sets with a target zero-field splitting.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for oracle inference.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search for ligand combinations whose predicted ZFS reaches the target.
    Search(SearchArgs),
    /// Look the target up in the corpus without running a search.
    Lookup(LookupArgs),
    /// Build the donor-mode index of the corpus.
    Index(IndexArgs),
}

/// Where the corpus and the trained models live.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Deployment profile: 'crystal' or 'optimized'.
    #[arg(short, long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Directory holding the profile's corpus and model files.
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Override the corpus CSV (defaults to the profile's file in the data directory).
    #[arg(long, value_name = "PATH")]
    pub corpus: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S assembly.batch-size=2000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `search` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Target zero-field splitting.
    #[arg(short, long, allow_negative_numbers = true, value_name = "ZFS")]
    pub target: f64,

    #[command(flatten)]
    pub data: DataArgs,

    /// Directory receiving every artifact of the run.
    #[arg(short, long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Directory mirroring every published artifact.
    #[arg(long, value_name = "DIR")]
    pub mirror_dir: Option<PathBuf>,

    /// Override the directory holding the model and scaler files.
    #[arg(long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// Maximum number of generations.
    #[arg(short, long, value_name = "INT")]
    pub generations: Option<u32>,

    /// Random seed.
    #[arg(short, long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Candidates assembled per generation.
    #[arg(short, long, value_name = "INT")]
    pub batch_size: Option<usize>,

    /// Largest distance from the target that counts as a corpus hit.
    #[arg(long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,
}

/// Arguments for the `lookup` subcommand.
#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    /// Target zero-field splitting.
    #[arg(short, long, allow_negative_numbers = true, value_name = "ZFS")]
    pub target: f64,

    #[command(flatten)]
    pub data: DataArgs,

    /// Directory receiving retrieved_solution.csv.
    #[arg(short, long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Largest distance from the target that counts as a corpus hit.
    #[arg(long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,
}

/// Arguments for the `index` subcommand.
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Output CSV (defaults to ligand_donor_modes.csv in the working directory).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_targets_and_repeated_sets_parse() {
        let cli = Cli::parse_from([
            "anisogen",
            "-vv",
            "search",
            "--target",
            "-400",
            "--profile",
            "optimized",
            "-S",
            "assembly.batch-size=100",
            "-S",
            "selection.ed-cutoff=0.2",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.target, -400.0);
        assert_eq!(args.data.profile.as_deref(), Some("optimized"));
        assert_eq!(args.data.set_values.len(), 2);
    }
}
