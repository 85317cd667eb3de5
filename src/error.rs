#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid size {0} is outside the supported range")]
    InvalidSize(usize),
    #[error("a {size}x{size} grid needs {expected} cells, got {actual}")]
    CellCount {
        size: usize,
        expected: usize,
        actual: usize,
    },
    #[error("log-value {exp} at cell {index} is too large")]
    InvalidExponent { index: usize, exp: u8 },
}

/// Failures an [`Agent`](crate::agent::Agent) can report instead of a direction.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    /// None of the four directions changes the grid: the game is over.
    #[error("no legal move left on the grid")]
    NoLegalMove,
    #[error("playout worker {0} panicked")]
    WorkerPanicked(usize),
    #[error("invalid monte carlo configuration: {0}")]
    InvalidConfig(String),
    #[error("could not build the playout thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(thiserror::Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("agent kept proposing illegal moves after {moves} moves")]
    Stalled { moves: usize },
    #[error("simulation batch {0} stopped without reporting")]
    BatchLost(usize),
}
