//! Scores for the grid a playout ends on.

use crate::Grid;

/// How a finished playout is turned into a number, higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heuristic {
    /// Sum of tile values times `1 + bonus * empty_cells`.
    #[default]
    SumWithEmptyBonus,
    /// `2^empty_cells`.
    EmptyCells,
    /// Tile values weighted by a gradient falling away from a corner, best
    /// corner wins, times the same empty cell bonus as the sum.
    Gradient,
}

impl Heuristic {
    pub fn score(self, grid: &Grid, empty_cell_bonus: f64) -> f64 {
        let empty = grid.empty_count() as f64;
        match self {
            Heuristic::SumWithEmptyBonus => {
                grid.tile_sum() as f64 * (1.0 + empty_cell_bonus * empty)
            }
            Heuristic::EmptyCells => empty.exp2(),
            Heuristic::Gradient => gradient_score(grid) * (1.0 + empty_cell_bonus * empty),
        }
    }
}

fn gradient_score(grid: &Grid) -> f64 {
    let last = grid.size() as i64 - 1;
    // weight of (row, col) for a gradient anchored at each corner
    let corners: [fn(i64, i64, i64) -> i64; 4] = [
        |r, c, last| last - r - c,
        |r, c, _| c - r,
        |r, c, _| r - c,
        |r, c, last| r + c - last,
    ];

    corners
        .iter()
        .map(|weight| {
            grid.cells()
                .enumerate()
                .filter_map(|(index, cell)| cell.map(|exp| (index, exp)))
                .map(|(index, exp)| {
                    let r = (index / grid.size()) as i64;
                    let c = (index % grid.size()) as i64;
                    (1u64 << exp) as f64 * weight(r, c, last) as f64
                })
                .sum::<f64>()
        })
        .fold(f64::NEG_INFINITY, f64::max)
}
