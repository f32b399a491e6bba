//! Board, ship and cell state for one player's fleet and the tracking
//! overlay of what they have learned about the opponent.

use core::fmt;

use rand::rngs::SmallRng;
use rand::Rng;

/// A (row, col) pair on a board. Value equality, usable as a map/set key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub row: usize,
    pub col: usize,
}

impl Coordinate {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Orthogonal neighbors, skipping those that would underflow.
    pub fn orthogonal(&self) -> impl Iterator<Item = Coordinate> + '_ {
        let (r, c) = (self.row as isize, self.col as isize);
        [(r - 1, c), (r + 1, c), (r, c - 1), (r, c + 1)]
            .into_iter()
            .filter(|&(r, c)| r >= 0 && c >= 0)
            .map(|(r, c)| Coordinate::new(r as usize, c as usize))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// State of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Empty,
    Ship,
    Hit,
    Miss,
}

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Fixed ship catalog. The standard fleet is exactly one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipType {
    Carrier,
    Battleship,
    Cruiser,
    Submarine,
    Destroyer,
}

/// The standard fleet, largest first.
pub const FLEET: [ShipType; 5] = [
    ShipType::Carrier,
    ShipType::Battleship,
    ShipType::Cruiser,
    ShipType::Submarine,
    ShipType::Destroyer,
];

impl ShipType {
    pub fn length(&self) -> usize {
        match self {
            ShipType::Carrier => 5,
            ShipType::Battleship => 4,
            ShipType::Cruiser => 3,
            ShipType::Submarine => 3,
            ShipType::Destroyer => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShipType::Carrier => "CARRIER",
            ShipType::Battleship => "BATTLESHIP",
            ShipType::Cruiser => "CRUISER",
            ShipType::Submarine => "SUBMARINE",
            ShipType::Destroyer => "DESTROYER",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, GridError> {
        match name {
            "CARRIER" => Ok(ShipType::Carrier),
            "BATTLESHIP" => Ok(ShipType::Battleship),
            "CRUISER" => Ok(ShipType::Cruiser),
            "SUBMARINE" => Ok(ShipType::Submarine),
            "DESTROYER" => Ok(ShipType::Destroyer),
            _ => Err(GridError::UnknownShipName),
        }
    }
}

/// Where and how a single ship goes on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub kind: ShipType,
    pub row: usize,
    pub col: usize,
    pub orientation: Orientation,
}

impl Placement {
    /// The cells this placement occupies, bow first.
    pub fn cells(&self) -> Vec<Coordinate> {
        (0..self.kind.length())
            .map(|i| match self.orientation {
                Orientation::Horizontal => Coordinate::new(self.row, self.col + i),
                Orientation::Vertical => Coordinate::new(self.row + i, self.col),
            })
            .collect()
    }
}

/// A placed ship. Health starts at the ship length and only drops on
/// unshielded hits; the shield absorbs exactly one hit and then clears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    kind: ShipType,
    cells: Vec<Coordinate>,
    health: usize,
    shielded: bool,
}

impl Ship {
    fn new(placement: Placement) -> Self {
        let cells = placement.cells();
        let health = cells.len();
        Self {
            kind: placement.kind,
            cells,
            health,
            shielded: false,
        }
    }

    pub fn kind(&self) -> ShipType {
        self.kind
    }

    pub fn cells(&self) -> &[Coordinate] {
        &self.cells
    }

    pub fn occupies(&self, coord: Coordinate) -> bool {
        self.cells.contains(&coord)
    }

    pub fn is_sunk(&self) -> bool {
        self.health == 0
    }

    pub fn is_shielded(&self) -> bool {
        self.shielded
    }

    pub fn apply_shield(&mut self) {
        self.shielded = true;
    }
}

/// Result of resolving one shot against a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    Miss,
    Hit,
    ShieldedHit,
    Sunk,
    AlreadyTargeted,
    OutOfBounds,
}

/// Errors returned by grid operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// Random placement gave up after too many collisions.
    UnableToPlaceShip,
    /// Ship name not part of the catalog.
    UnknownShipName,
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::UnableToPlaceShip => write!(f, "unable to place ship"),
            GridError::UnknownShipName => write!(f, "ship name not in catalog"),
        }
    }
}

impl std::error::Error for GridError {}

/// A rows x cols grid of cells plus the ships placed on it.
///
/// Two logical uses: a player's own fleet board, and their tracking board
/// recording what they know about the opponent (Empty/Hit/Miss only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    grid: Vec<CellState>,
    ships: Vec<Ship>,
}

impl Board {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            grid: vec![CellState::Empty; rows * cols],
            ships: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, coord: Coordinate) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    pub fn cell(&self, coord: Coordinate) -> Option<CellState> {
        if self.in_bounds(coord) {
            Some(self.grid[coord.row * self.cols + coord.col])
        } else {
            None
        }
    }

    /// Overwrite a cell state. Used for tracking boards; out-of-bounds
    /// coordinates are ignored.
    pub fn set_cell(&mut self, coord: Coordinate, state: CellState) {
        if self.in_bounds(coord) {
            self.grid[coord.row * self.cols + coord.col] = state;
        }
    }

    /// All coordinates of the board, row-major.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| Coordinate::new(r, c)))
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn ship_at(&self, coord: Coordinate) -> Option<&Ship> {
        self.ships.iter().find(|s| s.occupies(coord))
    }

    pub fn ship_at_mut(&mut self, coord: Coordinate) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| s.occupies(coord))
    }

    /// Number of ships still afloat.
    pub fn ships_afloat(&self) -> usize {
        self.ships.iter().filter(|s| !s.is_sunk()).count()
    }

    /// Placement is legal when every target cell is in bounds and Empty and
    /// no already-placed ship cell sits in the 8-neighborhood of any target
    /// cell (ships may not touch, even diagonally).
    pub fn can_place(&self, placement: Placement) -> bool {
        let cells = placement.cells();
        for coord in &cells {
            if !self.in_bounds(*coord) {
                return false;
            }
            if self.cell(*coord) != Some(CellState::Empty) {
                return false;
            }
            let (r, c) = (coord.row as isize, coord.col as isize);
            for dr in -1..=1isize {
                for dc in -1..=1isize {
                    let (nr, nc) = (r + dr, c + dc);
                    if nr < 0 || nc < 0 {
                        continue;
                    }
                    let n = Coordinate::new(nr as usize, nc as usize);
                    if self.cell(n) == Some(CellState::Ship) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Apply a placement. Callers validate with [`Board::can_place`] first;
    /// placing an invalid ship is a programming error and panics.
    pub fn place(&mut self, placement: Placement) {
        assert!(self.can_place(placement), "invalid ship placement");
        let ship = Ship::new(placement);
        for coord in ship.cells() {
            self.grid[coord.row * self.cols + coord.col] = CellState::Ship;
        }
        self.ships.push(ship);
    }

    /// Resolve one shot. Re-firing a resolved cell is idempotent and reports
    /// `AlreadyTargeted`; a shielded ship gives up its shield instead of
    /// health, though the cell is still marked Hit so trackers see feedback.
    pub fn fire_at(&mut self, target: Coordinate) -> ShotOutcome {
        let state = match self.cell(target) {
            Some(s) => s,
            None => return ShotOutcome::OutOfBounds,
        };
        match state {
            CellState::Hit | CellState::Miss => ShotOutcome::AlreadyTargeted,
            CellState::Empty => {
                self.set_cell(target, CellState::Miss);
                ShotOutcome::Miss
            }
            CellState::Ship => {
                self.set_cell(target, CellState::Hit);
                match self.ship_at_mut(target) {
                    Some(ship) if ship.shielded => {
                        ship.shielded = false;
                        ShotOutcome::ShieldedHit
                    }
                    Some(ship) => {
                        ship.health -= 1;
                        if ship.health == 0 {
                            ShotOutcome::Sunk
                        } else {
                            ShotOutcome::Hit
                        }
                    }
                    // Ship cell with no owning ship cannot happen after a
                    // valid placement sequence.
                    None => unreachable!("ship cell without a ship"),
                }
            }
        }
    }

    /// Ship cells not yet hit, counted by grid scan. This is the
    /// authoritative win-check path, decoupled from `Ship` bookkeeping.
    pub fn ship_cells_remaining(&self) -> usize {
        self.grid.iter().filter(|&&c| c == CellState::Ship).count()
    }

    pub fn all_ships_destroyed(&self) -> bool {
        self.ship_cells_remaining() == 0
    }
}

/// Place one of each fleet ship at random, respecting the no-touch rule.
/// Returns the placements applied so a peer can mirror them.
pub fn random_fleet(rng: &mut SmallRng, board: &mut Board) -> Result<Vec<Placement>, GridError> {
    let mut placements = Vec::with_capacity(FLEET.len());
    for kind in FLEET {
        let mut attempts = 0;
        loop {
            attempts += 1;
            if attempts > 1000 {
                return Err(GridError::UnableToPlaceShip);
            }
            let orientation = if rng.random() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let span = match orientation {
                Orientation::Horizontal => board.cols(),
                Orientation::Vertical => board.rows(),
            };
            let slack = match span.checked_sub(kind.length()) {
                Some(s) => s,
                None => return Err(GridError::UnableToPlaceShip),
            };
            // The cross axis can be zero too (degenerate board).
            let lateral = match orientation {
                Orientation::Horizontal => board.rows(),
                Orientation::Vertical => board.cols(),
            };
            let lateral_max = match lateral.checked_sub(1) {
                Some(m) => m,
                None => return Err(GridError::UnableToPlaceShip),
            };
            let (max_r, max_c) = match orientation {
                Orientation::Horizontal => (lateral_max, slack),
                Orientation::Vertical => (slack, lateral_max),
            };
            let placement = Placement {
                kind,
                row: rng.random_range(0..=max_r),
                col: rng.random_range(0..=max_c),
                orientation,
            };
            if board.can_place(placement) {
                board.place(placement);
                placements.push(placement);
                break;
            }
        }
    }
    Ok(placements)
}
