use neoretro::{
    random_fleet, Board, CellState, Coordinate, GridError, Orientation, Placement, ShipType,
    ShotOutcome, FLEET,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn place(board: &mut Board, kind: ShipType, row: usize, col: usize, horizontal: bool) {
    let placement = Placement {
        kind,
        row,
        col,
        orientation: if horizontal {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        },
    };
    assert!(board.can_place(placement), "placement should be legal");
    board.place(placement);
}

/// The standard fleet fits with row gaps, and every cell reads back as Ship.
fn standard_fleet(board: &mut Board) {
    place(board, ShipType::Carrier, 0, 0, true);
    place(board, ShipType::Battleship, 2, 0, true);
    place(board, ShipType::Cruiser, 4, 0, true);
    place(board, ShipType::Submarine, 6, 0, true);
    place(board, ShipType::Destroyer, 8, 0, true);
}

#[test]
fn test_place_and_sink() {
    let mut board = Board::new(10, 10);
    place(&mut board, ShipType::Cruiser, 4, 4, true);

    assert_eq!(board.fire_at(Coordinate::new(4, 4)), ShotOutcome::Hit);
    assert_eq!(board.fire_at(Coordinate::new(4, 5)), ShotOutcome::Hit);
    assert_eq!(board.fire_at(Coordinate::new(4, 6)), ShotOutcome::Sunk);
    assert!(board.ship_at(Coordinate::new(4, 4)).unwrap().is_sunk());
    assert!(board.all_ships_destroyed());
}

#[test]
fn test_fire_is_idempotent_on_resolved_cells() {
    let mut board = Board::new(10, 10);
    place(&mut board, ShipType::Destroyer, 0, 0, true);

    assert_eq!(board.fire_at(Coordinate::new(0, 0)), ShotOutcome::Hit);
    assert_eq!(
        board.fire_at(Coordinate::new(0, 0)),
        ShotOutcome::AlreadyTargeted
    );
    assert_eq!(board.cell(Coordinate::new(0, 0)), Some(CellState::Hit));

    assert_eq!(board.fire_at(Coordinate::new(5, 5)), ShotOutcome::Miss);
    assert_eq!(
        board.fire_at(Coordinate::new(5, 5)),
        ShotOutcome::AlreadyTargeted
    );
    assert_eq!(board.cell(Coordinate::new(5, 5)), Some(CellState::Miss));
}

#[test]
fn test_out_of_bounds_shot_rejected() {
    let mut board = Board::new(10, 10);
    assert_eq!(
        board.fire_at(Coordinate::new(10, 0)),
        ShotOutcome::OutOfBounds
    );
    assert_eq!(
        board.fire_at(Coordinate::new(0, 10)),
        ShotOutcome::OutOfBounds
    );
}

#[test]
fn test_shield_absorbs_exactly_one_hit() {
    let mut board = Board::new(10, 10);
    place(&mut board, ShipType::Cruiser, 0, 0, true);
    board.ship_at_mut(Coordinate::new(0, 0)).unwrap().apply_shield();

    // Shielded hit: cell still marked Hit, health untouched, shield gone.
    assert_eq!(board.fire_at(Coordinate::new(0, 0)), ShotOutcome::ShieldedHit);
    assert_eq!(board.cell(Coordinate::new(0, 0)), Some(CellState::Hit));
    assert!(!board.ship_at(Coordinate::new(0, 0)).unwrap().is_shielded());

    // The next two hits leave one health point, so the ship never sinks.
    assert_eq!(board.fire_at(Coordinate::new(0, 1)), ShotOutcome::Hit);
    assert_eq!(board.fire_at(Coordinate::new(0, 2)), ShotOutcome::Hit);
    assert!(!board.ship_at(Coordinate::new(0, 0)).unwrap().is_sunk());
}

#[test]
fn test_sunk_iff_no_hit_was_shielded() {
    // Unshielded ship: firing every cell sinks it.
    let mut board = Board::new(10, 10);
    place(&mut board, ShipType::Submarine, 0, 0, true);
    for c in 0..2 {
        assert_eq!(board.fire_at(Coordinate::new(0, c)), ShotOutcome::Hit);
    }
    assert_eq!(board.fire_at(Coordinate::new(0, 2)), ShotOutcome::Sunk);

    // Shielded ship: firing every cell does not sink it.
    let mut board = Board::new(10, 10);
    place(&mut board, ShipType::Submarine, 0, 0, true);
    board.ship_at_mut(Coordinate::new(0, 0)).unwrap().apply_shield();
    for c in 0..3 {
        assert_ne!(board.fire_at(Coordinate::new(0, c)), ShotOutcome::Sunk);
    }
    assert!(!board.ship_at(Coordinate::new(0, 0)).unwrap().is_sunk());
}

#[test]
fn test_adjacent_placement_rejected() {
    let mut board = Board::new(10, 10);
    place(&mut board, ShipType::Carrier, 5, 2, true);

    // Orthogonal touch.
    assert!(!board.can_place(Placement {
        kind: ShipType::Destroyer,
        row: 4,
        col: 2,
        orientation: Orientation::Horizontal,
    }));
    // Diagonal touch.
    assert!(!board.can_place(Placement {
        kind: ShipType::Destroyer,
        row: 6,
        col: 7,
        orientation: Orientation::Horizontal,
    }));
    // Overlap.
    assert!(!board.can_place(Placement {
        kind: ShipType::Cruiser,
        row: 5,
        col: 3,
        orientation: Orientation::Horizontal,
    }));
    // One row of water is enough.
    assert!(board.can_place(Placement {
        kind: ShipType::Destroyer,
        row: 7,
        col: 2,
        orientation: Orientation::Horizontal,
    }));
}

#[test]
fn test_standard_fleet_placement_and_sixth_ship_rejected() {
    let mut board = Board::new(10, 10);
    standard_fleet(&mut board);

    let expected: usize = FLEET.iter().map(|k| k.length()).sum();
    assert_eq!(board.ship_cells_remaining(), expected);
    assert_eq!(board.ships().len(), FLEET.len());

    // Any extra ship touching an existing one is rejected.
    for kind in FLEET {
        assert!(!board.can_place(Placement {
            kind,
            row: 1,
            col: 0,
            orientation: Orientation::Horizontal,
        }));
    }
}

#[test]
fn test_destruction_by_grid_scan() {
    let mut board = Board::new(10, 10);
    standard_fleet(&mut board);
    assert!(!board.all_ships_destroyed());

    let cells: Vec<Coordinate> = board
        .ships()
        .iter()
        .flat_map(|s| s.cells().to_vec())
        .collect();
    for coord in cells {
        assert_ne!(board.fire_at(coord), ShotOutcome::Miss);
    }
    assert!(board.all_ships_destroyed());
    assert_eq!(board.ship_cells_remaining(), 0);
}

#[test]
fn test_out_of_bounds_placement_rejected() {
    let board = Board::new(10, 10);
    assert!(!board.can_place(Placement {
        kind: ShipType::Carrier,
        row: 0,
        col: 6,
        orientation: Orientation::Horizontal,
    }));
    assert!(!board.can_place(Placement {
        kind: ShipType::Carrier,
        row: 6,
        col: 0,
        orientation: Orientation::Vertical,
    }));
}

#[test]
fn test_random_fleet_on_degenerate_boards_errors() {
    // Zero-sized axes must come back as an error, not a panic.
    for (rows, cols) in [(0, 0), (0, 10), (10, 0)] {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut board = Board::new(rows, cols);
        assert_eq!(
            random_fleet(&mut rng, &mut board),
            Err(GridError::UnableToPlaceShip)
        );
    }
}
