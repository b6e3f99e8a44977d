//! Report command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{ChartArgs, CountArgs, LatexArgs, ReportCommand, TableArgs};
use crate::report::{count_lines, ranking_table, write_chart, write_latex_ranking};
use crate::store::{GroupedRanking, RankingMetric, ResultStore};

pub fn run_report(command: ReportCommand, level: LogLevel) -> Result<(), String> {
    match command {
        ReportCommand::Count(args) => run_count(args),
        ReportCommand::Table(args) => run_table(args),
        ReportCommand::Latex(args) => run_latex(args, level),
        ReportCommand::Chart(args) => run_chart(args, level),
    }
}

fn open_store(db: &str) -> Result<ResultStore, String> {
    ResultStore::open(db).map_err(|e| format!("Store error: {e}"))
}

fn ranking_groups(
    store: &ResultStore,
    budget: usize,
    metric: &str,
    top: usize,
) -> Result<Vec<GroupedRanking>, String> {
    let metric: RankingMetric = metric.parse().map_err(|e| format!("{e}"))?;
    store.ranking(budget, metric, top).map_err(|e| e.to_string())
}

fn run_count(args: CountArgs) -> Result<(), String> {
    let store = open_store(&args.db)?;
    let counts = store.count_by_dataset().map_err(|e| e.to_string())?;
    if counts.is_empty() {
        println!("no stored runs");
    } else {
        println!("{}", count_lines(&counts));
    }
    Ok(())
}

fn run_table(args: TableArgs) -> Result<(), String> {
    let store = open_store(&args.db)?;
    let groups = ranking_groups(&store, args.budget, &args.metric, args.top)?;
    if groups.is_empty() {
        println!("no stored runs below the budget");
    } else {
        println!("{}", ranking_table(&groups));
    }
    Ok(())
}

fn run_latex(args: LatexArgs, level: LogLevel) -> Result<(), String> {
    let store = open_store(&args.table.db)?;
    let groups =
        ranking_groups(&store, args.table.budget, &args.table.metric, args.table.top)?;
    write_latex_ranking(&groups, &args.destination).map_err(|e| e.to_string())?;
    log(level, LogLevel::Normal, &format!("wrote {}", args.destination.display()));
    Ok(())
}

fn run_chart(args: ChartArgs, level: LogLevel) -> Result<(), String> {
    let store = open_store(&args.db)?;
    let groups = ranking_groups(&store, args.budget, &args.metric, args.top)?;
    if args.top == 0 || groups.len() < args.top {
        return Err(format!("No configuration ranked {}", args.top));
    }

    let target = &groups[args.top - 1];
    let runs = store
        .runs_for(&target.param_list_id, &args.dataset)
        .map_err(|e| e.to_string())?;
    write_chart(&runs, &args.destination).map_err(|e| e.to_string())?;
    log(level, LogLevel::Normal, &format!("wrote {}", args.destination.display()));
    Ok(())
}
