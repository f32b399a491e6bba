//! Charge/cooldown bookkeeping and the four enhanced-mode ability effects.
//!
//! Availability and consumption are gated by the engine; the handlers here
//! never fail, they only describe what happened.

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::engine::PlayerState;
use crate::grid::{CellState, Coordinate, ShotOutcome};

/// EMP locks the opponent's abilities for this many of their own turns.
pub const EMP_LOCK_TURNS: u32 = 2;
/// Shots fired by an automatic multishot when enough candidates exist.
pub const MULTISHOT_AUTO_SHOTS: usize = 3;
/// Sonar scans a square of Chebyshev radius 1 around the chosen center.
pub const SONAR_RADIUS: isize = 1;
/// Only ships at least this long can carry a shield.
pub const SHIELD_MIN_LENGTH: usize = 3;

/// The closed set of special abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AbilityType {
    Emp,
    Multishot,
    Shield,
    Sonar,
}

impl AbilityType {
    pub fn name(&self) -> &'static str {
        match self {
            AbilityType::Emp => "EMP",
            AbilityType::Multishot => "MULTISHOT",
            AbilityType::Shield => "SHIELD",
            AbilityType::Sonar => "SONAR",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "EMP" => Some(AbilityType::Emp),
            "MULTISHOT" => Some(AbilityType::Multishot),
            "SHIELD" => Some(AbilityType::Shield),
            "SONAR" => Some(AbilityType::Sonar),
            _ => None,
        }
    }
}

/// Per-ability configuration: cooldown length and total charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityRule {
    pub cooldown: u32,
    pub max_charges: u32,
}

/// Mutable per-ability state. Charges and cooldown never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityStatus {
    pub charges: u32,
    pub cooldown: u32,
}

impl AbilityStatus {
    pub fn new(rule: AbilityRule) -> Self {
        Self {
            charges: rule.max_charges,
            cooldown: 0,
        }
    }

    /// Usable iff a charge remains and the cooldown has elapsed.
    pub fn is_available(&self) -> bool {
        self.charges > 0 && self.cooldown == 0
    }

    /// Spend one charge and restart the cooldown. Charges never replenish.
    pub fn consume(&mut self, rule: AbilityRule) {
        self.charges = self.charges.saturating_sub(1);
        self.cooldown = rule.cooldown;
    }

    /// One own-turn has elapsed.
    pub fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }
}

/// All ability state for one player, keyed by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAbilities {
    entries: BTreeMap<AbilityType, (AbilityRule, AbilityStatus)>,
}

impl PlayerAbilities {
    pub fn new(rules: &BTreeMap<AbilityType, AbilityRule>) -> Self {
        let entries = rules
            .iter()
            .map(|(&kind, &rule)| (kind, (rule, AbilityStatus::new(rule))))
            .collect();
        Self { entries }
    }

    pub fn rule(&self, kind: AbilityType) -> Option<AbilityRule> {
        self.entries.get(&kind).map(|(rule, _)| *rule)
    }

    pub fn status(&self, kind: AbilityType) -> Option<AbilityStatus> {
        self.entries.get(&kind).map(|(_, status)| *status)
    }

    pub fn is_available(&self, kind: AbilityType) -> bool {
        self.entries
            .get(&kind)
            .is_some_and(|(_, status)| status.is_available())
    }

    /// Spend a charge. Returns false when the ability has no configured rule.
    pub fn consume(&mut self, kind: AbilityType) -> bool {
        match self.entries.get_mut(&kind) {
            Some((rule, status)) => {
                status.consume(*rule);
                true
            }
            None => false,
        }
    }

    pub fn tick_cooldowns(&mut self) {
        for (_, status) in self.entries.values_mut() {
            status.tick_cooldown();
        }
    }

    /// Read-only snapshot for presentation layers.
    pub fn snapshot(&self) -> Vec<(AbilityType, AbilityRule, AbilityStatus)> {
        self.entries
            .iter()
            .map(|(&kind, &(rule, status))| (kind, rule, status))
            .collect()
    }
}

/// The default enhanced-mode rule table.
pub fn default_rules() -> BTreeMap<AbilityType, AbilityRule> {
    BTreeMap::from([
        (
            AbilityType::Emp,
            AbilityRule {
                cooldown: 5,
                max_charges: 1,
            },
        ),
        (
            AbilityType::Multishot,
            AbilityRule {
                cooldown: 4,
                max_charges: 2,
            },
        ),
        (
            AbilityType::Shield,
            AbilityRule {
                cooldown: 6,
                max_charges: 1,
            },
        ),
        (
            AbilityType::Sonar,
            AbilityRule {
                cooldown: 3,
                max_charges: 2,
            },
        ),
    ])
}

/// What the ability target means depends on the ability; see the wire
/// grammar in [`crate::protocol`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbilityTarget {
    /// No coordinate supplied.
    None,
    /// A single chosen coordinate.
    Cell(Coordinate),
    /// Automatic multishot requesting this many shots.
    Auto(usize),
    /// Manual multishot over an explicit list.
    Cells(Vec<Coordinate>),
}

/// What an ability did: a player-facing message plus the cells actually
/// fired, so a session can rebroadcast an auto multishot in resolved form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityOutcome {
    pub message: String,
    pub shots: Vec<Coordinate>,
}

impl AbilityOutcome {
    fn message(text: impl Into<String>) -> Self {
        Self {
            message: text.into(),
            shots: Vec::new(),
        }
    }
}

type Handler = fn(&mut PlayerState, &mut PlayerState, &AbilityTarget, &mut SmallRng) -> AbilityOutcome;

/// Dispatch table from ability type to effect handler.
const HANDLERS: [(AbilityType, Handler); 4] = [
    (AbilityType::Emp, execute_emp),
    (AbilityType::Multishot, execute_multishot),
    (AbilityType::Shield, execute_shield),
    (AbilityType::Sonar, execute_sonar),
];

/// Run one ability effect. The charge has already been consumed by the
/// engine; a wasted effect still produces a message, never an error.
pub fn execute(
    kind: AbilityType,
    target: &AbilityTarget,
    actor: &mut PlayerState,
    opponent: &mut PlayerState,
    rng: &mut SmallRng,
) -> AbilityOutcome {
    let handler = HANDLERS
        .iter()
        .find_map(|&(k, h)| (k == kind).then_some(h))
        .expect("handler table covers every ability");
    handler(actor, opponent, target, rng)
}

fn execute_emp(
    _actor: &mut PlayerState,
    opponent: &mut PlayerState,
    _target: &AbilityTarget,
    _rng: &mut SmallRng,
) -> AbilityOutcome {
    // Re-applying EMP takes the max of the remaining lock, not the sum.
    opponent.emp_lock = opponent.emp_lock.max(EMP_LOCK_TURNS);
    AbilityOutcome::message(format!(
        "EMP burst! {} cannot use abilities for {} turns",
        opponent.name, EMP_LOCK_TURNS
    ))
}

fn execute_multishot(
    actor: &mut PlayerState,
    opponent: &mut PlayerState,
    target: &AbilityTarget,
    rng: &mut SmallRng,
) -> AbilityOutcome {
    let targets: Vec<Coordinate> = match target {
        AbilityTarget::Cells(cells) => cells.clone(),
        AbilityTarget::Auto(requested) => {
            let mut candidates = auto_candidates(actor);
            candidates.shuffle(rng);
            candidates.truncate((*requested).min(candidates.len()));
            candidates
        }
        // A single coordinate degenerates to a one-shot volley.
        AbilityTarget::Cell(coord) => vec![*coord],
        AbilityTarget::None => Vec::new(),
    };

    let mut shots = Vec::with_capacity(targets.len());
    let mut parts = Vec::with_capacity(targets.len());
    for coord in targets {
        let outcome = opponent.board.fire_at(coord);
        mark_tracking(actor, coord, outcome);
        shots.push(coord);
        parts.push(format!("{} {}", coord, describe_shot(outcome)));
    }
    let message = if parts.is_empty() {
        "Multishot fired no shots".to_string()
    } else {
        format!("Multishot: {}", parts.join(", "))
    };
    AbilityOutcome { message, shots }
}

fn execute_shield(
    actor: &mut PlayerState,
    _opponent: &mut PlayerState,
    target: &AbilityTarget,
    _rng: &mut SmallRng,
) -> AbilityOutcome {
    let coord = match target {
        AbilityTarget::Cell(c) => *c,
        // The charge is already spent; a missing target wastes it.
        _ => return AbilityOutcome::message("Shield fizzled: no target given"),
    };
    match actor.board.ship_at_mut(coord) {
        Some(ship) if ship.is_sunk() => {
            AbilityOutcome::message(format!("Shield wasted: the ship at {} is already sunk", coord))
        }
        Some(ship) if ship.kind().length() < SHIELD_MIN_LENGTH => AbilityOutcome::message(format!(
            "Shield wasted: {} is too small to carry a shield",
            ship.kind().name()
        )),
        Some(ship) if ship.is_shielded() => {
            AbilityOutcome::message("Shield wasted: that ship is already shielded")
        }
        Some(ship) => {
            ship.apply_shield();
            AbilityOutcome::message(format!(
                "Shield raised on {}: the next hit will be absorbed",
                ship.kind().name()
            ))
        }
        None => AbilityOutcome::message(format!("Shield wasted: no ship at {}", coord)),
    }
}

fn execute_sonar(
    _actor: &mut PlayerState,
    opponent: &mut PlayerState,
    target: &AbilityTarget,
    _rng: &mut SmallRng,
) -> AbilityOutcome {
    let center = match target {
        AbilityTarget::Cell(c) => *c,
        _ => return AbilityOutcome::message("Sonar fizzled: no center given"),
    };
    // Information only: reads the opponent's true board, marks nothing.
    let mut contacts = Vec::new();
    for dr in -SONAR_RADIUS..=SONAR_RADIUS {
        for dc in -SONAR_RADIUS..=SONAR_RADIUS {
            let (r, c) = (center.row as isize + dr, center.col as isize + dc);
            if r < 0 || c < 0 {
                continue;
            }
            let coord = Coordinate::new(r as usize, c as usize);
            if !opponent.board.in_bounds(coord) {
                continue;
            }
            if opponent.board.ship_at(coord).is_some() {
                contacts.push(coord);
            }
        }
    }
    if contacts.is_empty() {
        AbilityOutcome::message(format!("Sonar around {}: no contacts", center))
    } else {
        let listed: Vec<String> = contacts.iter().map(|c| c.to_string()).collect();
        AbilityOutcome::message(format!(
            "Sonar around {}: contacts at {}",
            center,
            listed.join(", ")
        ))
    }
}

/// Candidate cells for an automatic multishot: Empty tracking neighbors of
/// tracked hits first (finish the ship), then any Empty tracking cell, then
/// the whole board as a failsafe.
fn auto_candidates(actor: &PlayerState) -> Vec<Coordinate> {
    let tracking = &actor.tracking;
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
    if !near_hits.is_empty() {
        return near_hits;
    }
    let empty: Vec<Coordinate> = tracking
        .coordinates()
        .filter(|&c| tracking.cell(c) == Some(CellState::Empty))
        .collect();
    if !empty.is_empty() {
        return empty;
    }
    tracking.coordinates().collect()
}

/// Mark the firer's tracking board the way a normal Fire would.
pub fn mark_tracking(actor: &mut PlayerState, coord: Coordinate, outcome: ShotOutcome) {
    match outcome {
        ShotOutcome::Hit | ShotOutcome::ShieldedHit | ShotOutcome::Sunk => {
            actor.tracking.set_cell(coord, CellState::Hit);
        }
        ShotOutcome::Miss => {
            actor.tracking.set_cell(coord, CellState::Miss);
        }
        ShotOutcome::AlreadyTargeted | ShotOutcome::OutOfBounds => {}
    }
}

/// Short human label for a shot outcome, used in turn messages.
pub fn describe_shot(outcome: ShotOutcome) -> &'static str {
    match outcome {
        ShotOutcome::Miss => "miss",
        ShotOutcome::Hit => "hit",
        ShotOutcome::ShieldedHit => "hit (shield absorbed)",
        ShotOutcome::Sunk => "hit and sunk",
        ShotOutcome::AlreadyTargeted => "already targeted",
        ShotOutcome::OutOfBounds => "out of bounds",
    }
}
