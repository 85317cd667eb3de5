//! Invariants of the grid engine over generated boards and random games.
use c2048::{Direction, Grid, DEFAULT_SIZE};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

fn direction() -> impl Strategy<Value = Direction> {
    prop::sample::select(Direction::ALL.to_vec())
}

fn any_grid() -> impl Strategy<Value = Grid> {
    (2usize..=5).prop_flat_map(|size| {
        prop::collection::vec(0u8..6, size * size)
            .prop_map(move |exps| Grid::from_cells(size, &exps).unwrap())
    })
}

proptest! {
    #[test]
    fn reported_change_matches_actual_change(grid in any_grid(), dir in direction()) {
        let mut moved = grid.clone();
        let changed = moved.apply_move(dir);
        prop_assert_eq!(changed, moved.exps() != grid.exps());

        let before_second = moved.exps();
        let changed_again = moved.apply_move(dir);
        prop_assert_eq!(changed_again, moved.exps() != before_second);
    }

    #[test]
    fn probe_agrees_with_apply(grid in any_grid()) {
        for dir in Direction::ALL {
            prop_assert_eq!(grid.can_move(dir), grid.clone_move(dir).is_some());
        }
        let expected = grid.empty_count() > 0 || !grid.legal_directions().is_empty();
        prop_assert_eq!(grid.has_any_legal_move(), expected);
    }

    #[test]
    fn moves_preserve_the_tile_sum(grid in any_grid(), dir in direction()) {
        let mut moved = grid.clone();
        moved.apply_move(dir);
        prop_assert_eq!(moved.tile_sum(), grid.tile_sum());
        prop_assert_eq!(moved.score(), grid.score());
        // merges never raise a tile by more than one step
        prop_assert!(moved.highest_exp() <= grid.highest_exp() + 1);
    }

    #[test]
    fn random_games_keep_sum_and_score_monotonic(
        seed in any::<u64>(),
        dirs in prop::collection::vec(direction(), 1..120),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut grid = Grid::new_game(DEFAULT_SIZE, &mut rng).unwrap();

        for dir in dirs {
            let sum = grid.tile_sum();
            let score = grid.score();
            let snapshot = grid.clone();

            let mut copy = grid.clone();
            copy.apply_move(dir);
            copy.spawn_tile(&mut rng);
            prop_assert_eq!(&grid, &snapshot);

            if grid.apply_move(dir) {
                let points = grid.spawn_tile(&mut rng);
                prop_assert!(points == 4 || points == 8);
                prop_assert_eq!(grid.tile_sum(), sum + points / 2);
                prop_assert_eq!(grid.score(), score + points);
            } else {
                prop_assert_eq!(grid.tile_sum(), sum);
            }
            prop_assert!(grid.tile_sum() >= sum);
            prop_assert!(grid.score() >= score);
        }
    }
}
