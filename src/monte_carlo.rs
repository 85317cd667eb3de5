//! Flat Monte Carlo move selection.
//!
//! Every legal first move is scored by the average outcome of many short
//! random playouts started from the moved grid. Playouts for one direction
//! are spread over a persistent worker pool; the caller waits for every
//! worker of that direction, then adds their partial sums in worker order
//! so equal inputs always reduce to equal scores.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use log::{debug, trace};
use rand::{rngs::StdRng, seq::SliceRandom, RngCore, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::agent::{Agent, RandomAgent};
use crate::{AgentError, Direction, Grid, Heuristic};

/// Times the inner agent is asked again after proposing an illegal move
/// before the playout picks a random legal one itself.
pub const MAX_REQUERIES: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloConfig {
    /// Playouts per candidate direction, split over all workers.
    pub simulations_per_move: usize,
    /// Moves played after the candidate move before the grid is scored.
    pub max_playout_depth: usize,
    pub empty_cell_bonus: f64,
    pub workers: usize,
    pub heuristic: Heuristic,
    /// Seeds worker `w` with `seed + w`, the same streams for every
    /// direction, which makes the evaluation reproducible.
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            simulations_per_move: 2000,
            max_playout_depth: 14,
            empty_cell_bonus: 0.1,
            workers: thread::available_parallelism().map_or(1, usize::from),
            heuristic: Heuristic::default(),
            seed: None,
        }
    }
}

impl MonteCarloConfig {
    fn validate(&self) -> Result<(), AgentError> {
        if self.simulations_per_move == 0 {
            return Err(AgentError::InvalidConfig(
                "simulations_per_move must be at least 1".into(),
            ));
        }
        if self.workers == 0 {
            return Err(AgentError::InvalidConfig("workers must be at least 1".into()));
        }
        if !self.empty_cell_bonus.is_finite() || self.empty_cell_bonus < 0.0 {
            return Err(AgentError::InvalidConfig(format!(
                "empty_cell_bonus must be a non-negative number, got {}",
                self.empty_cell_bonus
            )));
        }
        Ok(())
    }
}

/// Evaluation of one candidate direction. Illegal directions keep a zero
/// score and `legal == false`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchEval {
    pub dir: Direction,
    pub score: f64,
    pub legal: bool,
}

#[derive(Debug, Clone, Copy)]
struct Playout {
    max_depth: usize,
    empty_cell_bonus: f64,
    heuristic: Heuristic,
}

impl Playout {
    /// Plays on `grid`, which the playout owns, and scores where it stops.
    fn run<A: Agent + ?Sized>(
        &self,
        mut grid: Grid,
        inner: &A,
        rng: &mut dyn RngCore,
    ) -> Result<f64, AgentError> {
        grid.spawn_tile(rng);

        let mut moves = 0;
        while moves < self.max_depth && grid.has_any_legal_move() {
            let Some(direction) = pick_move(&grid, inner, rng)? else {
                break;
            };
            grid.apply_move(direction);
            grid.spawn_tile(rng);
            moves += 1;
        }

        Ok(self.heuristic.score(&grid, self.empty_cell_bonus))
    }
}

fn pick_move<A: Agent + ?Sized>(
    grid: &Grid,
    inner: &A,
    rng: &mut dyn RngCore,
) -> Result<Option<Direction>, AgentError> {
    for _ in 0..MAX_REQUERIES {
        match inner.next_move(grid, rng) {
            Ok(direction) if grid.can_move(direction) => return Ok(Some(direction)),
            Ok(_) => continue,
            Err(AgentError::NoLegalMove) => return Ok(None),
            Err(err) => return Err(err),
        }
    }
    Ok(grid.legal_directions().choose(rng).copied())
}

/// Splits `total` units of work over `workers`, the first workers taking the remainder.
pub(crate) fn split_evenly(total: usize, workers: usize) -> Vec<usize> {
    let base = total / workers;
    let remainder = total % workers;
    (0..workers)
        .map(|worker| base + usize::from(worker < remainder))
        .collect()
}

/// Picks the move whose random continuations score best on average.
///
/// The inner agent drives the playouts, [`RandomAgent`] by default. The
/// worker pool lives as long as the agent and is reused by every call.
pub struct MonteCarloAgent<A: Agent = RandomAgent> {
    config: MonteCarloConfig,
    playout: Playout,
    inner: A,
    pool: ThreadPool,
}

impl MonteCarloAgent<RandomAgent> {
    pub fn random_based(config: MonteCarloConfig) -> Result<Self, AgentError> {
        Self::new(RandomAgent, config)
    }
}

impl<A: Agent> MonteCarloAgent<A> {
    pub fn new(inner: A, config: MonteCarloConfig) -> Result<Self, AgentError> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("playout-{i}"))
            .build()?;
        let playout = Playout {
            max_depth: config.max_playout_depth,
            empty_cell_bonus: config.empty_cell_bonus,
            heuristic: config.heuristic,
        };

        Ok(Self {
            config,
            playout,
            inner,
            pool,
        })
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Scores every direction in `Direction::ALL` order.
    pub fn branch_evals(&self, grid: &Grid) -> Result<[BranchEval; 4], AgentError> {
        let mut branches = Direction::ALL.map(|dir| BranchEval {
            dir,
            score: 0.0,
            legal: false,
        });

        for branch in branches.iter_mut() {
            let Some(moved) = grid.clone_move(branch.dir) else {
                trace!("{} is illegal, skipped", branch.dir);
                continue;
            };
            branch.score = self.evaluate(moved)?;
            branch.legal = true;
            debug!("{}: {:.3}", branch.dir, branch.score);
        }

        Ok(branches)
    }

    /// Best legal direction; ties go to the one enumerated first.
    pub fn best_move(&self, grid: &Grid) -> Result<Direction, AgentError> {
        let mut best: Option<(f64, Direction)> = None;
        for branch in self.branch_evals(grid)?.iter().filter(|branch| branch.legal) {
            if best.map_or(true, |(score, _)| branch.score > score) {
                best = Some((branch.score, branch.dir));
            }
        }
        best.map(|(_, dir)| dir).ok_or(AgentError::NoLegalMove)
    }

    /// Average playout score from `start`, the grid right after the
    /// candidate move and before its spawn.
    fn evaluate(&self, start: Grid) -> Result<f64, AgentError> {
        let total = self.config.simulations_per_move;
        let shares = split_evenly(total, self.config.workers);

        // collect keeps worker order whatever order the workers finish in
        let partials: Vec<Result<f64, AgentError>> = self.pool.install(|| {
            shares
                .par_iter()
                .enumerate()
                .map(|(worker, &share)| self.run_share(worker, share, &start))
                .collect()
        });

        let mut score = 0.0;
        for partial in partials {
            score += partial? / total as f64;
        }
        Ok(score)
    }

    /// Sum of `share` playout scores on worker `worker`'s own stream.
    fn run_share(&self, worker: usize, share: usize, start: &Grid) -> Result<f64, AgentError> {
        if share == 0 {
            return Ok(0.0);
        }
        let mut rng = self.worker_rng(worker);
        panic::catch_unwind(AssertUnwindSafe(|| {
            let mut sum = 0.0;
            for _ in 0..share {
                sum += self.playout.run(start.clone(), &self.inner, &mut rng)?;
            }
            Ok::<f64, AgentError>(sum)
        }))
        .unwrap_or(Err(AgentError::WorkerPanicked(worker)))
    }

    fn worker_rng(&self, worker: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker as u64)),
            None => StdRng::from_entropy(),
        }
    }
}

impl<A: Agent> Agent for MonteCarloAgent<A> {
    /// Workers draw from their own streams, so `rng` is not used.
    fn next_move(&self, grid: &Grid, _rng: &mut dyn RngCore) -> Result<Direction, AgentError> {
        self.best_move(grid)
    }
}
