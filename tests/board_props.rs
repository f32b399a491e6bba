use neoretro::{random_fleet, Board, CellState, Coordinate, ShotOutcome};
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn random_board(seed: u64) -> Board {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut board = Board::new(10, 10);
    random_fleet(&mut rng, &mut board).unwrap();
    board
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// No two ships ever occupy the same or 8-adjacent cells after a
    /// successful placement sequence.
    #[test]
    fn fleet_never_touches(seed in any::<u64>()) {
        let board = random_board(seed);
        for (i, a) in board.ships().iter().enumerate() {
            for b in board.ships().iter().skip(i + 1) {
                for ca in a.cells() {
                    for cb in b.cells() {
                        let dr = ca.row.abs_diff(cb.row);
                        let dc = ca.col.abs_diff(cb.col);
                        prop_assert!(dr > 1 || dc > 1, "{} and {} touch", ca, cb);
                    }
                }
            }
        }
    }

    /// Re-firing any resolved cell reports AlreadyTargeted and changes
    /// nothing.
    #[test]
    fn refire_is_idempotent(seed in any::<u64>(), row in 0usize..10, col in 0usize..10) {
        let mut board = random_board(seed);
        let target = Coordinate::new(row, col);
        let first = board.fire_at(target);
        prop_assert_ne!(first, ShotOutcome::AlreadyTargeted);
        let after_first = board.clone();
        let second = board.fire_at(target);
        prop_assert_eq!(second, ShotOutcome::AlreadyTargeted);
        prop_assert_eq!(board, after_first);
    }

    /// Grid scan and ship bookkeeping agree while no shield is involved.
    #[test]
    fn scan_matches_ship_health(seed in any::<u64>(), shots in prop::collection::vec((0usize..10, 0usize..10), 0..60)) {
        let mut board = random_board(seed);
        for (r, c) in shots {
            let _ = board.fire_at(Coordinate::new(r, c));
        }
        let unhit_cells = board.ship_cells_remaining();
        let by_ships: usize = board
            .ships()
            .iter()
            .flat_map(|s| s.cells().to_vec())
            .filter(|&c| board.cell(c) == Some(CellState::Ship))
            .count();
        prop_assert_eq!(unhit_cells, by_ships);
    }
}
