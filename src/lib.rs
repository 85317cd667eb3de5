//! c2048: a 2048 grid engine and a Monte Carlo move picker.
//!
//! The grid stores log-values (`exp`), a tile showing `2^exp`, with `0`
//! meaning an empty cell. Moving and spawning are separate steps so legality
//! can be probed without touching the grid:
//!
//! ```
//! use c2048::{create_grid, Direction};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut grid = create_grid!(
//!     1, 1, 1, 1,
//!     0, 0, 0, 0,
//!     0, 0, 0, 0,
//!     0, 0, 0, 0,
//! );
//! assert!(grid.apply_move(Direction::Left));
//! assert_eq!(&grid.exps()[..4], &[2, 2, 0, 0]);
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let points = grid.spawn_tile(&mut rng);
//! assert!(points == 4 || points == 8);
//! assert_eq!(grid.score(), points);
//! ```
use std::fmt;

use csta::prelude::*;
use csta_derive::Randomizable;
use rand::prelude::*;

pub mod agent;
pub mod error;
pub mod heuristic;
pub mod monte_carlo;
pub mod sim;

pub use agent::{Agent, LegalRandomAgent, RandomAgent};
pub use error::{AgentError, GridError, SimError};
pub use heuristic::Heuristic;
pub use monte_carlo::{BranchEval, MonteCarloAgent, MonteCarloConfig};

pub const DEFAULT_SIZE: usize = 4;
/// Largest supported side length.
pub const MAX_SIZE: usize = 8;
/// 2^11 = 2048.
pub const WINNING_EXP: u8 = 11;
pub const MAX_EXP: u8 = 30;
/// Chance that a spawned tile is a 4 instead of a 2.
pub const FOUR_PROBABILITY: f64 = 0.1;

/// Slide direction. The declaration order is the enumeration order used to
/// break ties between equally scored moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Randomizable)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Tile {
    pub(crate) exp: u8,
    pub(crate) is_merged: bool,
}

impl Eq for Tile {}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.exp.eq(&other.exp)
    }
}

impl Ord for Tile {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.exp.cmp(&other.exp)
    }
}

impl PartialOrd for Tile {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Slides `$from` into `$to`. Evaluates to `true` when the step was a merge,
/// `false` for a plain slide, and breaks the enclosing loop when blocked.
macro_rules! avance {
    ($self:tt, $from:expr, $to:expr) => {{
        let source = $self.tiles[$from];
        let target = $self.tiles[$to];
        if target.exp == 0 {
            $self.tiles[$to] = source;
            $self.tiles[$from] = Tile::default();
            false
        } else if target.exp == source.exp && !target.is_merged && !source.is_merged {
            $self.tiles[$to] = Tile {
                exp: target.exp + 1,
                is_merged: true,
            };
            $self.tiles[$from] = Tile::default();
            true
        } else {
            break;
        }
    }};
}

/// Builds a square [`Grid`] from row-major log-values, `0` being empty.
///
/// # Panics
///
/// When the number of values is not a supported square or a value is too large.
#[macro_export]
macro_rules! create_grid {
    ( $( $exp:expr ),+ $(,)? ) => {{
        let exps: Vec<u8> = vec![ $( $exp ),+ ];
        let size = (exps.len() as f64).sqrt() as usize;
        $crate::Grid::from_cells(size, &exps).expect("create_grid! needs a valid square grid")
    }};
}

/// A square 2048 board plus the score accumulated by spawned tiles.
///
/// Cloning is a deep copy: simulations always work on their own clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    tiles: Vec<Tile>,
    score: u64,
}

impl Grid {
    /// An empty `size`x`size` grid with a zero score.
    pub fn new(size: usize) -> Result<Self, GridError> {
        if size == 0 || size > MAX_SIZE {
            return Err(GridError::InvalidSize(size));
        }
        Ok(Self {
            size,
            tiles: vec![Tile::default(); size * size],
            score: 0,
        })
    }

    /// A fresh game: an empty grid seeded with two spawned tiles.
    pub fn new_game<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Self, GridError> {
        let mut grid = Self::new(size)?;
        grid.spawn_tile(rng);
        grid.spawn_tile(rng);
        Ok(grid)
    }

    pub fn from_cells(size: usize, exps: &[u8]) -> Result<Self, GridError> {
        let mut grid = Self::new(size)?;
        if exps.len() != grid.tiles.len() {
            return Err(GridError::CellCount {
                size,
                expected: grid.tiles.len(),
                actual: exps.len(),
            });
        }
        for (index, (tile, &exp)) in grid.tiles.iter_mut().zip(exps).enumerate() {
            if exp > MAX_EXP {
                return Err(GridError::InvalidExponent { index, exp });
            }
            tile.exp = exp;
        }
        Ok(grid)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Points accumulated by spawned tiles.
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Log-value at (`row`, `col`), `None` when empty or out of bounds.
    pub fn cell(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.size || col >= self.size {
            return None;
        }
        match self.tiles[row * self.size + col].exp {
            0 => None,
            exp => Some(exp),
        }
    }

    /// Row-major cells, `None` for empty ones.
    pub fn cells(&self) -> impl Iterator<Item = Option<u8>> + '_ {
        self.tiles
            .iter()
            .map(|tile| (tile.exp != 0).then_some(tile.exp))
    }

    /// Row-major log-values with `0` for empty cells.
    pub fn exps(&self) -> Vec<u8> {
        self.tiles.iter().map(|tile| tile.exp).collect()
    }

    pub fn empty_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.exp == 0).count()
    }

    /// Sum of the displayed tile values.
    pub fn tile_sum(&self) -> u64 {
        self.tiles
            .iter()
            .filter(|tile| tile.exp != 0)
            .map(|tile| 1u64 << tile.exp)
            .sum()
    }

    pub fn highest_exp(&self) -> u8 {
        self.tiles.iter().max().map_or(0, |tile| tile.exp)
    }

    pub fn is_won(&self) -> bool {
        self.tiles.iter().any(|tile| tile.exp == WINNING_EXP)
    }

    /// True while some cell is empty or some direction would change the grid.
    pub fn has_any_legal_move(&self) -> bool {
        self.tiles.iter().any(|tile| tile.exp == 0)
            || Direction::ALL.iter().any(|&direction| self.can_move(direction))
    }

    pub fn is_lost(&self) -> bool {
        !self.has_any_legal_move()
    }

    /// Whether `direction` would slide or merge anything. Never mutates.
    pub fn can_move(&self, direction: Direction) -> bool {
        self.tiles.iter().enumerate().any(|(index, tile)| {
            tile.exp != 0
                && self.neighbour(index, direction).is_some_and(|to| {
                    let target = self.tiles[to].exp;
                    target == 0 || target == tile.exp
                })
        })
    }

    pub fn legal_directions(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&direction| self.can_move(direction))
            .collect()
    }

    /// Slides and merges every tile toward `direction`, returning whether
    /// anything changed. Does not spawn.
    pub fn apply_move(&mut self, direction: Direction) -> bool {
        let len = self.tiles.len();
        let mut has_moved = false;

        for k in 0..len {
            // tiles closest to the target edge go first
            let start = match direction {
                Direction::Up | Direction::Left => k,
                Direction::Down | Direction::Right => len - 1 - k,
            };
            if self.tiles[start].exp == 0 {
                continue;
            }

            let mut from = start;
            while let Some(to) = self.neighbour(from, direction) {
                let merged = avance!(self, from, to);
                has_moved = true;
                if merged {
                    break;
                }
                from = to;
            }
        }

        for tile in self.tiles.iter_mut() {
            tile.is_merged = false;
        }
        has_moved
    }

    /// A moved copy, or `None` when `direction` is illegal here.
    pub fn clone_move(&self, direction: Direction) -> Option<Self> {
        let mut clone = self.clone();
        clone.apply_move(direction).then_some(clone)
    }

    /// Spawns a 2 or a 4 on a uniformly chosen empty cell and adds twice its
    /// value to the score. Returns the points added, `0` on a full grid.
    pub fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u64 {
        self.spawn_tile_with_chance(rng, FOUR_PROBABILITY)
    }

    pub fn spawn_tile_with_chance<R: Rng + ?Sized>(&mut self, rng: &mut R, chance: f64) -> u64 {
        let Some(tile) = self
            .tiles
            .iter_mut()
            .filter(|tile| tile.exp == 0)
            .choose(rng)
        else {
            return 0;
        };
        tile.exp = if rng.gen::<f64>() < chance { 2 } else { 1 };

        let points = 2u64 << tile.exp;
        self.score += points;
        points
    }

    fn neighbour(&self, index: usize, direction: Direction) -> Option<usize> {
        let next = match direction {
            Direction::Up => index.checked_sub(self.size)?,
            Direction::Down => index + self.size,
            Direction::Left => index.checked_sub(1)?,
            Direction::Right => index + 1,
        };
        if next >= self.tiles.len() {
            return None;
        }
        // horizontal steps must not wrap into the adjacent row
        let same_line = direction.is_vertical() || next / self.size == index / self.size;
        same_line.then_some(next)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.tiles.chunks(self.size) {
            let line: Vec<String> = row
                .iter()
                .map(|tile| match tile.exp {
                    0 => format!("{: >6}", "."),
                    exp => format!("{: >6}", 1u64 << exp),
                })
                .collect();
            writeln!(f, "{}", line.join(""))?;
        }
        write!(f, "score: {}", self.score)
    }
}
