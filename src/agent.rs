//! Pluggable decision logic for non-human sides.

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::abilities::{AbilityTarget, AbilityType, MULTISHOT_AUTO_SHOTS, SHIELD_MIN_LENGTH};
use crate::engine::{GameMode, GameState, PlayerState, TurnAction};
use crate::grid::{CellState, Coordinate};

/// The single call the engine makes into human/AI/network logic.
pub trait PlayerAgent: Send {
    fn choose_action(
        &mut self,
        rng: &mut SmallRng,
        state: &GameState,
        is_player_one: bool,
    ) -> TurnAction;
}

/// Rough game phase, classified by how much of the tracking board is still
/// unexplored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Early,
    Mid,
    Late,
}

fn classify_phase(unexplored_ratio: f64) -> Phase {
    if unexplored_ratio > 0.7 {
        Phase::Early
    } else if unexplored_ratio > 0.4 {
        Phase::Mid
    } else {
        Phase::Late
    }
}

/// Heuristic AI: hunt on checkerboard parity, finish damaged ships first,
/// and in enhanced mode occasionally spend an ability.
pub struct HeuristicAgent;

impl HeuristicAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerAgent for HeuristicAgent {
    fn choose_action(
        &mut self,
        rng: &mut SmallRng,
        state: &GameState,
        is_player_one: bool,
    ) -> TurnAction {
        let me = if is_player_one { 0 } else { 1 };
        let myself = state.player(me);
        let opponent = state.player(me ^ 1);

        let total = (myself.tracking.rows() * myself.tracking.cols()) as f64;
        let unexplored = myself
            .tracking
            .coordinates()
            .filter(|&c| myself.tracking.cell(c) == Some(CellState::Empty))
            .count() as f64;
        let ratio = unexplored / total;
        let phase = classify_phase(ratio);

        if state.config.mode == GameMode::Enhanced && myself.emp_lock == 0 {
            let consider = match phase {
                Phase::Early => 0.40,
                Phase::Mid => 0.25,
                Phase::Late => 0.10,
            };
            if rng.random_range(0.0..1.0) < consider {
                if let Some(action) = pick_ability(rng, myself, opponent, phase, ratio) {
                    return action;
                }
            }
        }

        TurnAction::Fire(pick_fire_target(rng, myself))
    }
}

/// Evaluate ability candidates in fixed priority order; each is gated by its
/// own probability and by availability. Falls through to firing when nothing
/// triggers.
fn pick_ability(
    rng: &mut SmallRng,
    myself: &PlayerState,
    opponent: &PlayerState,
    phase: Phase,
    unexplored_ratio: f64,
) -> Option<TurnAction> {
    let abilities = myself.abilities.as_ref()?;

    if phase == Phase::Early
        && abilities.is_available(AbilityType::Sonar)
        && rng.random_range(0.0..1.0) < 0.5
    {
        let center = sonar_center(rng, myself);
        return Some(TurnAction::UseAbility {
            kind: AbilityType::Sonar,
            target: AbilityTarget::Cell(center),
        });
    }

    if unexplored_ratio > 0.3
        && abilities.is_available(AbilityType::Multishot)
        && rng.random_range(0.0..1.0) < 0.5
    {
        return Some(TurnAction::UseAbility {
            kind: AbilityType::Multishot,
            target: AbilityTarget::Auto(MULTISHOT_AUTO_SHOTS),
        });
    }

    if opponent.board.ships_afloat() >= 3
        && abilities.is_available(AbilityType::Emp)
        && rng.random_range(0.0..1.0) < 0.4
    {
        return Some(TurnAction::UseAbility {
            kind: AbilityType::Emp,
            target: AbilityTarget::None,
        });
    }

    if abilities.is_available(AbilityType::Shield) && rng.random_range(0.0..1.0) < 0.15 {
        if let Some(coord) = shield_target(myself) {
            return Some(TurnAction::UseAbility {
                kind: AbilityType::Shield,
                target: AbilityTarget::Cell(coord),
            });
        }
    }

    None
}

/// Somewhere still unexplored, or the board center as a last resort.
fn sonar_center(rng: &mut SmallRng, myself: &PlayerState) -> Coordinate {
    let empty: Vec<Coordinate> = myself
        .tracking
        .coordinates()
        .filter(|&c| myself.tracking.cell(c) == Some(CellState::Empty))
        .collect();
    empty
        .choose(rng)
        .copied()
        .unwrap_or(Coordinate::new(
            myself.tracking.rows() / 2,
            myself.tracking.cols() / 2,
        ))
}

/// First own shieldable ship: unsunk, unshielded, long enough.
fn shield_target(myself: &PlayerState) -> Option<Coordinate> {
    myself
        .board
        .ships()
        .iter()
        .find(|s| !s.is_sunk() && !s.is_shielded() && s.kind().length() >= SHIELD_MIN_LENGTH)
        .and_then(|s| s.cells().first().copied())
}

/// Target mode around known hits, else hunt on checkerboard parity, else any
/// empty cell, else anything at all.
fn pick_fire_target(rng: &mut SmallRng, myself: &PlayerState) -> Coordinate {
    let tracking = &myself.tracking;

    let mut near_hits = Vec::new();
    for coord in tracking.coordinates() {
        if tracking.cell(coord) != Some(CellState::Hit) {
            continue;
        }
        for n in coord.orthogonal() {
            if tracking.cell(n) == Some(CellState::Empty) && !near_hits.contains(&n) {
                near_hits.push(n);
            }
        }
    }
    if let Some(coord) = near_hits.choose(rng) {
        return *coord;
    }

    // Parity hunt: the smallest ship is length 2, so one color class of the
    // checkerboard is guaranteed to touch every ship.
    let parity: Vec<Coordinate> = tracking
        .coordinates()
        .filter(|&c| (c.row + c.col) % 2 == 0 && tracking.cell(c) == Some(CellState::Empty))
        .collect();
    if let Some(coord) = parity.choose(rng) {
        return *coord;
    }

    let empty: Vec<Coordinate> = tracking
        .coordinates()
        .filter(|&c| tracking.cell(c) == Some(CellState::Empty))
        .collect();
    if let Some(coord) = empty.choose(rng) {
        return *coord;
    }

    let all: Vec<Coordinate> = tracking.coordinates().collect();
    all.choose(rng)
        .copied()
        .unwrap_or(Coordinate::new(0, 0))
}
