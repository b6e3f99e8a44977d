//! Search command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{ExperimentConfig, SearchArgs, SearchKind};
use crate::search::{EvolutionarySearch, RandomSearch, SearchOutcome};
use crate::store::ResultStore;

/// The pass-through configuration every sampled trial is layered over.
pub fn base_config(args: &SearchArgs) -> Result<ExperimentConfig, String> {
    let classifier = args
        .classifier
        .parse()
        .map_err(|e| format!("Invalid classifier: {e}"))?;
    let cores = args.cores.unwrap_or_else(|| {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    });

    let mut config = ExperimentConfig::default()
        .with_datasets_path(&args.datasets_path)
        .with_db(&args.db)
        .with_classifier(classifier)
        .with_random_seed(args.random_seed)
        .with_nr_queries_per_iteration(args.nr_queries_per_iteration)
        .with_nr_learning_iterations(args.nr_learning_iterations);
    config.cores = cores;
    config.test_fraction = args.test_fraction;
    config.validate().map_err(|e| format!("Invalid configuration: {e}"))?;
    Ok(config)
}

pub fn run_search(args: SearchArgs, level: LogLevel) -> Result<(), String> {
    let config = base_config(&args)?;
    let store = ResultStore::open(&args.db).map_err(|e| format!("Store error: {e}"))?;
    log(
        level,
        LogLevel::Normal,
        &format!("searching over {} datasets, results into {}", args.datasets.len(), args.db),
    );

    let outcome = match args.hyper_search_type {
        SearchKind::Random => RandomSearch::new(config, args.nr_random_runs)
            .with_level(level)
            .run(&args.datasets, &store),
        SearchKind::Evo => {
            EvolutionarySearch::new(config, args.population_size, args.generations_number)
                .with_tournament_size(args.tournament_size)
                .with_gene_mutation_prob(args.gene_mutation_prob)
                .with_level(level)
                .run(&args.datasets, &store)
        }
    }
    .map_err(|e| format!("Search failed: {e}"))?;

    print_outcome(&outcome, level)
}

fn print_outcome(outcome: &SearchOutcome, level: LogLevel) -> Result<(), String> {
    let best = serde_json::to_string_pretty(&outcome.best_config)
        .map_err(|e| format!("Cannot render best configuration: {e}"))?;
    println!("{best}");
    println!("best score: {:.4}", outcome.best_score);

    for (rank, trial) in outcome.ranked().iter().take(10).enumerate() {
        log(
            level,
            LogLevel::Normal,
            &format!("{:>2}. trial {:>4}  {:.4}", rank + 1, trial.id, trial.score.unwrap_or(f64::NAN)),
        );
    }
    let failures = outcome.failures();
    if !failures.is_empty() {
        log(level, LogLevel::Normal, &format!("{} trials failed", failures.len()));
    }
    Ok(())
}
