use csta::prelude::*;
use rand::{distributions::Standard, seq::SliceRandom, RngCore};

use crate::{AgentError, Direction, Grid};

/// Something that picks the next move for a grid.
///
/// The grid handed in should be a copy of the game state. `Send + Sync` lets
/// one agent drive playouts on every worker thread at once, each worker
/// passing its own random stream.
pub trait Agent: Send + Sync {
    fn next_move(&self, grid: &Grid, rng: &mut dyn RngCore) -> Result<Direction, AgentError>;
}

impl<A: Agent + ?Sized> Agent for std::sync::Arc<A> {
    fn next_move(&self, grid: &Grid, rng: &mut dyn RngCore) -> Result<Direction, AgentError> {
        (**self).next_move(grid, rng)
    }
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn next_move(&self, grid: &Grid, rng: &mut dyn RngCore) -> Result<Direction, AgentError> {
        (**self).next_move(grid, rng)
    }
}

/// Picks one of the four directions uniformly, ignoring the grid.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomAgent;

impl Agent for RandomAgent {
    fn next_move(&self, _: &Grid, rng: &mut dyn RngCore) -> Result<Direction, AgentError> {
        Ok(<Direction as Randomizable>::sample(&Standard, rng))
    }
}

/// Picks uniformly among the directions that change the grid.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegalRandomAgent;

impl Agent for LegalRandomAgent {
    fn next_move(&self, grid: &Grid, rng: &mut dyn RngCore) -> Result<Direction, AgentError> {
        grid.legal_directions()
            .choose(rng)
            .copied()
            .ok_or(AgentError::NoLegalMove)
    }
}
