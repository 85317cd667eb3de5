use c2048::sim::play_game;
use c2048::{
    create_grid, Agent, AgentError, Direction, Grid, LegalRandomAgent, MonteCarloAgent,
    MonteCarloConfig,
};
use rand::{rngs::StdRng, SeedableRng};

fn small_config(seed: Option<u64>) -> MonteCarloConfig {
    MonteCarloConfig {
        simulations_per_move: 200,
        max_playout_depth: 8,
        workers: 4,
        seed,
        ..MonteCarloConfig::default()
    }
}

#[test]
fn only_legal_direction_is_chosen() {
    let grid = create_grid!(
        0, 1, 2, 1,
        0, 2, 1, 2,
        0, 1, 2, 1,
        0, 2, 1, 2,
    );
    assert_eq!(grid.legal_directions(), vec![Direction::Left]);

    let agent = MonteCarloAgent::random_based(small_config(None)).unwrap();
    for _ in 0..3 {
        assert_eq!(agent.best_move(&grid).unwrap(), Direction::Left);
    }
}

#[test]
fn dead_grid_has_no_move() {
    let grid = create_grid!(
        1, 2, 1, 2,
        2, 1, 2, 1,
        1, 2, 1, 2,
        2, 1, 2, 1,
    );
    let agent = MonteCarloAgent::random_based(small_config(Some(1))).unwrap();
    let mut rng = StdRng::seed_from_u64(0);

    assert!(matches!(
        agent.next_move(&grid, &mut rng),
        Err(AgentError::NoLegalMove)
    ));
    let branches = agent.branch_evals(&grid).unwrap();
    assert!(branches.iter().all(|branch| !branch.legal));
}

#[test]
fn symmetric_ties_go_to_the_first_direction() {
    let config = MonteCarloConfig {
        simulations_per_move: 50,
        max_playout_depth: 0,
        workers: 2,
        seed: Some(2048),
        ..MonteCarloConfig::default()
    };
    let agent = MonteCarloAgent::random_based(config).unwrap();

    // a lone tile can go anywhere and every result looks the same
    let centered = create_grid!(
        0, 0, 0, 0,
        0, 1, 0, 0,
        0, 0, 0, 0,
        0, 0, 0, 0,
    );
    // up and left are blocked, down and right mirror each other
    let cornered = create_grid!(
        1, 0, 0, 0,
        0, 0, 0, 0,
        0, 0, 0, 0,
        0, 0, 0, 0,
    );

    for _ in 0..5 {
        let branches = agent.branch_evals(&centered).unwrap();
        assert!(branches.iter().all(|branch| branch.legal));
        assert!(branches.iter().all(|branch| branch.score == branches[0].score));
        assert_eq!(agent.best_move(&centered).unwrap(), Direction::Up);
        assert_eq!(agent.best_move(&cornered).unwrap(), Direction::Down);
    }
}

#[test]
fn symmetric_ties_hold_with_many_workers() {
    let agent = MonteCarloAgent::random_based(MonteCarloConfig {
        simulations_per_move: 1000,
        max_playout_depth: 0,
        workers: 8,
        seed: Some(2048),
        ..MonteCarloConfig::default()
    })
    .unwrap();
    let centered = create_grid!(
        0, 0, 0, 0,
        0, 1, 0, 0,
        0, 0, 0, 0,
        0, 0, 0, 0,
    );

    for _ in 0..100 {
        let branches = agent.branch_evals(&centered).unwrap();
        assert!(branches
            .iter()
            .all(|branch| branch.score.to_bits() == branches[0].score.to_bits()));
        assert_eq!(agent.best_move(&centered).unwrap(), Direction::Up);
    }
}

#[test]
fn seeded_agents_agree() {
    let grid = create_grid!(
        1, 1, 2, 0,
        0, 3, 0, 0,
        2, 0, 0, 1,
        0, 0, 1, 0,
    );
    let first = MonteCarloAgent::random_based(MonteCarloConfig {
        workers: 2,
        ..small_config(Some(99))
    })
    .unwrap();
    let second = MonteCarloAgent::random_based(MonteCarloConfig {
        workers: 2,
        ..small_config(Some(99))
    })
    .unwrap();

    assert_eq!(
        first.branch_evals(&grid).unwrap(),
        second.branch_evals(&grid).unwrap()
    );
}

#[test]
fn chosen_move_is_always_legal_on_real_games() {
    let agent = MonteCarloAgent::random_based(MonteCarloConfig {
        simulations_per_move: 40,
        max_playout_depth: 4,
        workers: 2,
        ..MonteCarloConfig::default()
    })
    .unwrap();
    let mut rng = StdRng::seed_from_u64(12);
    let mut grid = Grid::new_game(4, &mut rng).unwrap();

    // the same agent, and pool, serves every call
    for _ in 0..30 {
        match agent.best_move(&grid) {
            Ok(direction) => {
                assert!(grid.apply_move(direction));
                grid.spawn_tile(&mut rng);
            }
            Err(AgentError::NoLegalMove) => {
                assert!(!grid.has_any_legal_move());
                break;
            }
            Err(err) => panic!("unexpected failure: {err}"),
        }
    }
}

#[test]
fn monte_carlo_can_drive_a_full_game() {
    let agent = MonteCarloAgent::new(
        LegalRandomAgent,
        MonteCarloConfig {
            simulations_per_move: 8,
            max_playout_depth: 2,
            workers: 2,
            seed: Some(5),
            ..MonteCarloConfig::default()
        },
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let record = play_game(&agent, 3, &mut rng).unwrap();
    assert!(record.moves > 0);
}
