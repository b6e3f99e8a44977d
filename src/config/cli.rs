//! Command-line surface
//!
//! ```bash
//! indagar search --hyper-search-type random --db results.db
//! indagar report table --db results.db --top 5
//! indagar report chart --db results.db --dataset dwtc --destination chart.json
//! indagar migrate --db results.db
//! indagar datasets --datasets-path datasets
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::data::BUILTIN_DATASETS;

#[derive(Parser, Debug)]
#[command(
    name = "indagar",
    version,
    about = "Hyperparameter search over simulated active-learning cycles",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a hyperparameter search, storing one row per (dataset, trial)
    Search(SearchArgs),

    /// Aggregate stored results
    #[command(subcommand)]
    Report(ReportCommand),

    /// Per-run summary of the best stored results
    Stats(StatsArgs),

    /// Add and backfill the derived global-score columns on an old database
    Migrate(MigrateArgs),

    /// Materialize the built-in demo datasets as JSON files
    Datasets(DatasetsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchKind {
    /// Independent configurations sampled from continuous distributions
    Random,
    /// Evolutionary search over discrete grids
    Evo,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search driver
    #[arg(long, value_enum, default_value_t = SearchKind::Random)]
    pub hyper_search_type: SearchKind,

    /// Directory holding `{name}.json` dataset files
    #[arg(long, default_value = "datasets")]
    pub datasets_path: String,

    /// Datasets to evaluate every trial on
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = BUILTIN_DATASETS.iter().map(|name| name.to_string())
    )]
    pub datasets: Vec<String>,

    /// Classifier trained inside the cycle (naive_bayes or knn)
    #[arg(long, default_value = "naive_bayes")]
    pub classifier: String,

    /// Worker threads; defaults to the number of CPUs
    #[arg(long)]
    pub cores: Option<usize>,

    #[arg(long, default_value_t = 42)]
    pub random_seed: u64,

    #[arg(long, default_value_t = 0.5)]
    pub test_fraction: f64,

    /// Upper bound on cycle iterations per run
    #[arg(long, default_value_t = 1_000_000)]
    pub nr_learning_iterations: usize,

    /// Cap on the sampled oracle batch size
    #[arg(long, default_value_t = 150)]
    pub nr_queries_per_iteration: usize,

    /// Trials for the random driver
    #[arg(long, default_value_t = 200_000)]
    pub nr_random_runs: usize,

    #[arg(long, default_value_t = 100)]
    pub population_size: usize,

    #[arg(long, default_value_t = 100)]
    pub tournament_size: usize,

    #[arg(long, default_value_t = 100)]
    pub generations_number: usize,

    #[arg(long, default_value_t = 0.3)]
    pub gene_mutation_prob: f64,

    /// SQLite database results are written to
    #[arg(long, default_value = "experiment_results.db")]
    pub db: String,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Stored rows per dataset
    Count(CountArgs),

    /// Top configurations grouped by hyperparameters
    Table(TableArgs),

    /// The same table as a LaTeX fragment
    Latex(LatexArgs),

    /// Per-iteration timeline of the best configuration as Vega-Lite JSON
    Chart(ChartArgs),
}

#[derive(clap::Args, Debug)]
pub struct CountArgs {
    #[arg(long, default_value = "experiment_results.db")]
    pub db: String,
}

#[derive(clap::Args, Debug)]
pub struct TableArgs {
    #[arg(long, default_value = "experiment_results.db")]
    pub db: String,

    /// Configurations shown
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Ignore runs that asked the oracle this many times or more
    #[arg(long, default_value_t = 2000)]
    pub budget: usize,

    /// Ranking metric: fit_score, global_score_no_weak_acc, or
    /// amount_of_user_asked_queries
    #[arg(long, default_value = "fit_score")]
    pub metric: String,
}

#[derive(clap::Args, Debug)]
pub struct LatexArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// Output .tex path
    #[arg(long)]
    pub destination: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ChartArgs {
    #[arg(long, default_value = "experiment_results.db")]
    pub db: String,

    /// Chart the configuration ranked this high (1 = best)
    #[arg(long, default_value_t = 1)]
    pub top: usize,

    #[arg(long, default_value_t = 2000)]
    pub budget: usize,

    #[arg(long, default_value = "fit_score")]
    pub metric: String,

    /// Dataset whose runs are drawn
    #[arg(long)]
    pub dataset: String,

    /// Output .json path
    #[arg(long)]
    pub destination: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    #[arg(long, default_value = "experiment_results.db")]
    pub db: String,

    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(clap::Args, Debug)]
pub struct MigrateArgs {
    #[arg(long, default_value = "experiment_results.db")]
    pub db: String,
}

#[derive(clap::Args, Debug)]
pub struct DatasetsArgs {
    #[arg(long, default_value = "datasets")]
    pub datasets_path: String,

    #[arg(long, default_value_t = 42)]
    pub random_seed: u64,
}

pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)
}
