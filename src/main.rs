use std::{error::Error, sync::Arc};

use c2048::sim::{Controller, SimResult};
use c2048::{
    Heuristic, LegalRandomAgent, MonteCarloAgent, MonteCarloConfig, RandomAgent, DEFAULT_SIZE,
};
use clap::{Parser, ValueEnum};
use file_log::log;
use flexi_logger::Logger;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AgentKind {
    Random,
    LegalRandom,
    MonteCarlo,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HeuristicKind {
    Sum,
    EmptyCells,
    Gradient,
}

impl From<HeuristicKind> for Heuristic {
    fn from(kind: HeuristicKind) -> Self {
        match kind {
            HeuristicKind::Sum => Heuristic::SumWithEmptyBonus,
            HeuristicKind::EmptyCells => Heuristic::EmptyCells,
            HeuristicKind::Gradient => Heuristic::Gradient,
        }
    }
}

/// Plays 2048 games with the chosen agent and prints score statistics.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(short, long, default_value_t = 5)]
    games: usize,

    #[arg(short, long, value_enum, default_value_t = AgentKind::MonteCarlo)]
    agent: AgentKind,

    /// Playouts per candidate move.
    #[arg(short, long, default_value_t = 2000)]
    simulations: usize,

    /// Moves per playout before the grid is scored.
    #[arg(short, long, default_value_t = 14)]
    depth: usize,

    #[arg(long, default_value_t = 0.1)]
    empty_bonus: f64,

    #[arg(long, value_enum, default_value_t = HeuristicKind::Sum)]
    heuristic: HeuristicKind,

    /// Playout workers, defaults to the available parallelism.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Games played at the same time.
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    #[arg(long, default_value_t = DEFAULT_SIZE)]
    size: usize,

    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let _logger = Logger::try_with_env_or_str("info")?.start()?;
    let args = Args::parse();

    let controller = Controller {
        n_threads: args.threads,
        n_games: args.games,
        size: args.size,
        seed: args.seed,
    };

    let result = match args.agent {
        AgentKind::Random => controller.launch(Arc::new(RandomAgent))?,
        AgentKind::LegalRandom => controller.launch(Arc::new(LegalRandomAgent))?,
        AgentKind::MonteCarlo => {
            let defaults = MonteCarloConfig::default();
            let config = MonteCarloConfig {
                simulations_per_move: args.simulations,
                max_playout_depth: args.depth,
                empty_cell_bonus: args.empty_bonus,
                workers: args.workers.unwrap_or(defaults.workers),
                heuristic: args.heuristic.into(),
                seed: args.seed,
            };
            controller.launch(Arc::new(MonteCarloAgent::random_based(config)?))?
        }
    };

    report(&result);
    Ok(())
}

fn report(result: &SimResult) {
    println!();
    println!(
        "Time: {:?} per game, avg score: {:.0}, max score: {}, min score: {}, wins: {}",
        result.time_per_game(),
        result.average_score(),
        result.max_score().unwrap_or(0),
        result.min_score().unwrap_or(0),
        result.wins,
    );
    for (exp, games) in result
        .games_by_highest
        .iter()
        .enumerate()
        .filter(|(_, games)| **games > 0)
    {
        println!("{}'s:\t{}", 1u64 << exp, games);
    }

    log!("avg_score", "{}", result.average_score());
    log!("victories", "{}", result.wins);
}
