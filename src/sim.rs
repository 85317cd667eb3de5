//! Plays whole games with an agent and gathers score statistics.

use std::{
    sync::{mpsc, Arc},
    thread,
    time::{Duration, Instant},
};

use log::info;
use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::error::SimError;
use crate::monte_carlo::split_evenly;
use crate::{Agent, AgentError, Grid, DEFAULT_SIZE};

/// A progress line is logged every this many moves.
pub const PROGRESS_EVERY: usize = 250;
/// Illegal proposals in a row after which a game is abandoned.
pub const MAX_STALLED_PROPOSALS: usize = 1000;
const HIGHEST_SLOTS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRecord {
    pub score: u64,
    pub highest_exp: u8,
    pub moves: usize,
    pub won: bool,
}

/// Plays one game from two spawned tiles until no legal move is left.
///
/// The agent only ever sees a copy of the grid, and a tile is spawned only
/// after a move that changed something.
pub fn play_game<A: Agent + ?Sized>(
    agent: &A,
    size: usize,
    rng: &mut dyn RngCore,
) -> Result<GameRecord, SimError> {
    let mut grid = Grid::new_game(size, rng)?;
    let mut moves = 0;
    let mut stalled = 0;

    while grid.has_any_legal_move() {
        let direction = match agent.next_move(&grid.clone(), rng) {
            Ok(direction) => direction,
            Err(AgentError::NoLegalMove) => break,
            Err(err) => return Err(err.into()),
        };
        if !grid.apply_move(direction) {
            stalled += 1;
            if stalled >= MAX_STALLED_PROPOSALS {
                return Err(SimError::Stalled { moves });
            }
            continue;
        }
        stalled = 0;
        grid.spawn_tile(rng);

        moves += 1;
        if moves % PROGRESS_EVERY == 0 {
            info!("moves: {moves}, score: {}", grid.score());
        }
    }

    Ok(GameRecord {
        score: grid.score(),
        highest_exp: grid.highest_exp(),
        moves,
        won: grid.highest_exp() >= crate::WINNING_EXP,
    })
}

#[derive(Debug, Clone, Default)]
pub struct SimResult {
    pub scores: Vec<u64>,
    /// Games counted by the exponent of their highest tile.
    pub games_by_highest: [usize; HIGHEST_SLOTS],
    pub wins: usize,
    pub moves: usize,
    pub elapsed: Duration,
}

impl SimResult {
    pub fn add(&mut self, record: GameRecord) {
        self.scores.push(record.score);
        self.games_by_highest[usize::from(record.highest_exp).min(HIGHEST_SLOTS - 1)] += 1;
        self.wins += usize::from(record.won);
        self.moves += record.moves;
    }

    pub fn merge(&mut self, other: &mut SimResult) {
        for (other_count, self_count) in other
            .games_by_highest
            .iter()
            .zip(self.games_by_highest.iter_mut())
        {
            *self_count += other_count;
        }
        self.scores.append(&mut other.scores);
        self.wins += other.wins;
        self.moves += other.moves;
    }

    pub fn games(&self) -> usize {
        self.scores.len()
    }

    pub fn average_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<u64>() as f64 / self.scores.len() as f64
    }

    pub fn min_score(&self) -> Option<u64> {
        self.scores.iter().copied().min()
    }

    pub fn max_score(&self) -> Option<u64> {
        self.scores.iter().copied().max()
    }

    pub fn time_per_game(&self) -> Duration {
        match u32::try_from(self.games()) {
            Ok(games) if games > 0 => self.elapsed / games,
            _ => Duration::ZERO,
        }
    }
}

/// A batch of games played on one thread.
#[derive(Debug)]
pub struct Sim {
    id: usize,
    n_games: usize,
    size: usize,
    rng: StdRng,
    result: SimResult,
}

impl Sim {
    pub fn new(id: usize, n_games: usize, size: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            id,
            n_games,
            size,
            rng,
            result: SimResult::default(),
        }
    }

    pub fn run<A: Agent + ?Sized>(&mut self, agent: &A) -> Result<(), SimError> {
        let now = Instant::now();
        for game in 0..self.n_games {
            let record = play_game(agent, self.size, &mut self.rng)?;
            info!(
                "batch {} game {}: score {}, highest {}, {} moves",
                self.id,
                game,
                record.score,
                1u64 << record.highest_exp,
                record.moves
            );
            self.result.add(record);
        }
        self.result.elapsed = now.elapsed();
        info!("batch {: >3} ended in {:?}", self.id, self.result.elapsed);
        Ok(())
    }

    pub fn into_result(self) -> SimResult {
        self.result
    }
}

/// Spreads `n_games` over `n_threads` threads, each reporting its batch
/// through a channel.
#[derive(Debug, Clone)]
pub struct Controller {
    pub n_threads: usize,
    pub n_games: usize,
    pub size: usize,
    /// Batch `i` is seeded with `seed + i`.
    pub seed: Option<u64>,
}

impl Controller {
    pub fn new(n_games: usize) -> Self {
        Self {
            n_threads: thread::available_parallelism().map_or(1, usize::from),
            n_games,
            size: DEFAULT_SIZE,
            seed: None,
        }
    }

    pub fn launch<A: Agent + 'static>(&self, agent: Arc<A>) -> Result<SimResult, SimError> {
        let now = Instant::now();
        let (sender, receiver) = mpsc::channel();

        let mut pending = Vec::new();
        for (id, games) in split_evenly(self.n_games, self.n_threads.max(1))
            .into_iter()
            .enumerate()
            .filter(|&(_, games)| games > 0)
        {
            let sender = sender.clone();
            let agent = Arc::clone(&agent);
            let mut sim = Sim::new(
                id,
                games,
                self.size,
                self.seed.map(|seed| seed.wrapping_add(id as u64)),
            );
            thread::spawn(move || {
                let outcome = sim.run(agent.as_ref()).map(|()| sim.into_result());
                sender.send((id, outcome))
            });
            pending.push(id);
        }
        drop(sender);

        // every batch reports before the first failure is returned
        let mut total = SimResult::default();
        let mut failure = None;
        for (id, outcome) in receiver {
            pending.retain(|&batch| batch != id);
            match outcome {
                Ok(mut result) => total.merge(&mut result),
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }
        if let Some(&lost) = pending.first() {
            return Err(SimError::BatchLost(lost));
        }

        total.elapsed = now.elapsed();
        info!("{} games ended in {:?}", total.games(), total.elapsed);
        Ok(total)
    }
}
