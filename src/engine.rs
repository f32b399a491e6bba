//! Turn state machine: whose turn it is, action dispatch, win detection.

use std::collections::BTreeMap;

use log::debug;
use rand::rngs::SmallRng;

use crate::abilities::{
    self, default_rules, AbilityRule, AbilityTarget, AbilityType, PlayerAbilities,
};
use crate::grid::{Board, Coordinate, ShotOutcome};

/// Game variant. Enhanced enables the ability subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Classic,
    Enhanced,
}

impl GameMode {
    pub fn name(&self) -> &'static str {
        match self {
            GameMode::Classic => "CLASSIC",
            GameMode::Enhanced => "ENHANCED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CLASSIC" => Some(GameMode::Classic),
            "ENHANCED" => Some(GameMode::Enhanced),
            _ => None,
        }
    }
}

/// Immutable game setup: grid dimensions, mode, ability rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub mode: GameMode,
    pub rules: BTreeMap<AbilityType, AbilityRule>,
}

impl GameConfig {
    pub fn classic(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            mode: GameMode::Classic,
            rules: BTreeMap::new(),
        }
    }

    pub fn enhanced(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            mode: GameMode::Enhanced,
            rules: default_rules(),
        }
    }
}

/// Everything one side owns: fleet board, tracking board, abilities and the
/// EMP lock counter (abilities unusable while > 0).
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub name: String,
    pub board: Board,
    pub tracking: Board,
    pub abilities: Option<PlayerAbilities>,
    pub emp_lock: u32,
}

impl PlayerState {
    fn new(name: &str, config: &GameConfig) -> Self {
        let abilities = match config.mode {
            GameMode::Enhanced => Some(PlayerAbilities::new(&config.rules)),
            GameMode::Classic => None,
        };
        Self {
            name: name.to_string(),
            board: Board::new(config.rows, config.cols),
            tracking: Board::new(config.rows, config.cols),
            abilities,
            emp_lock: 0,
        }
    }

    /// Start-of-turn bookkeeping for the side about to act.
    fn tick_turn_counters(&mut self) {
        self.emp_lock = self.emp_lock.saturating_sub(1);
        if let Some(abilities) = &mut self.abilities {
            abilities.tick_cooldowns();
        }
    }
}

/// Whole-game state: config, both players, whose turn, terminal status.
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: GameConfig,
    players: [PlayerState; 2],
    current: usize,
    over: bool,
    winner: Option<usize>,
}

impl GameState {
    pub fn new(config: GameConfig, player1: &str, player2: &str) -> Self {
        let players = [
            PlayerState::new(player1, &config),
            PlayerState::new(player2, &config),
        ];
        Self {
            config,
            players,
            current: 0,
            over: false,
            winner: None,
        }
    }

    /// Index of the side whose turn is active (0 or 1).
    pub fn current_player(&self) -> usize {
        self.current
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn player(&self, idx: usize) -> &PlayerState {
        &self.players[idx]
    }

    pub fn player_mut(&mut self, idx: usize) -> &mut PlayerState {
        &mut self.players[idx]
    }

    /// Split borrow: the acting player and their opponent.
    fn pair_mut(&mut self, actor: usize) -> (&mut PlayerState, &mut PlayerState) {
        let (left, right) = self.players.split_at_mut(1);
        if actor == 0 {
            (&mut left[0], &mut right[0])
        } else {
            (&mut right[0], &mut left[0])
        }
    }

    /// Flip the active side and tick its per-turn counters.
    pub fn next_turn(&mut self) {
        self.current ^= 1;
        self.players[self.current].tick_turn_counters();
    }

    /// Terminal transition; no further turns are processed afterward.
    pub fn end_game(&mut self, winner: usize) {
        self.over = true;
        self.winner = Some(winner);
    }
}

/// What a player asked to do this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    Fire(Coordinate),
    UseAbility {
        kind: AbilityType,
        target: AbilityTarget,
    },
}

/// Outcome of one `process_turn` call. `applied` is the canonical form of
/// the executed action (an auto multishot resolves to its shot list) so a
/// peer session can rebroadcast it deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    pub success: bool,
    pub message: String,
    pub winner: Option<usize>,
    pub applied: TurnAction,
}

impl TurnResult {
    fn rejected(message: impl Into<String>, action: &TurnAction) -> Self {
        Self {
            success: false,
            message: message.into(),
            winner: None,
            applied: action.clone(),
        }
    }
}

/// Orchestrates one full game over a [`GameState`].
pub struct GameEngine {
    state: GameState,
}

impl GameEngine {
    pub fn new(state: GameState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Validate and apply one action for the active side.
    ///
    /// Invalid local operations (refired cell, unavailable ability) come back
    /// as non-fatal failures with the turn unflipped so the caller retries.
    pub fn process_turn(&mut self, rng: &mut SmallRng, action: TurnAction) -> TurnResult {
        if self.state.is_over() {
            return TurnResult::rejected("the game is already over", &action);
        }
        let actor = self.state.current_player();
        match action {
            TurnAction::Fire(target) => self.process_fire(actor, target),
            TurnAction::UseAbility { kind, target } => {
                self.process_ability(rng, actor, kind, target)
            }
        }
    }

    fn process_fire(&mut self, actor: usize, target: Coordinate) -> TurnResult {
        let action = TurnAction::Fire(target);
        let (acting, opponent) = self.state.pair_mut(actor);
        let outcome = opponent.board.fire_at(target);
        match outcome {
            ShotOutcome::OutOfBounds => {
                return TurnResult::rejected(format!("{} is off the board", target), &action)
            }
            ShotOutcome::AlreadyTargeted => {
                return TurnResult::rejected(
                    format!("{} was already targeted", target),
                    &action,
                )
            }
            _ => {}
        }
        abilities::mark_tracking(acting, target, outcome);
        let message = format!(
            "{} fires at {}: {}",
            acting.name,
            target,
            abilities::describe_shot(outcome)
        );
        debug!("turn: {}", message);
        self.finish_turn(actor, message, action)
    }

    fn process_ability(
        &mut self,
        rng: &mut SmallRng,
        actor: usize,
        kind: AbilityType,
        target: AbilityTarget,
    ) -> TurnResult {
        let action = TurnAction::UseAbility {
            kind,
            target: target.clone(),
        };
        if self.state.config.mode != GameMode::Enhanced {
            return TurnResult::rejected("abilities are not available in classic mode", &action);
        }
        {
            let acting = self.state.player(actor);
            if acting.emp_lock > 0 {
                return TurnResult::rejected(
                    format!("abilities are EMP-locked for {} more turns", acting.emp_lock),
                    &action,
                );
            }
            let abilities = match &acting.abilities {
                Some(a) => a,
                None => {
                    return TurnResult::rejected("no abilities configured", &action);
                }
            };
            if abilities.rule(kind).is_none() {
                return TurnResult::rejected(
                    format!("{} is not configured for this game", kind.name()),
                    &action,
                );
            }
            if !abilities.is_available(kind) {
                return TurnResult::rejected(
                    format!("{} is not available (cooldown or charges)", kind.name()),
                    &action,
                );
            }
        }

        // All gates passed: consume the charge, then delegate. A wasted
        // effect past this point still spends the charge and the turn.
        let (acting, opponent) = self.state.pair_mut(actor);
        if let Some(abilities) = &mut acting.abilities {
            abilities.consume(kind);
        }
        let outcome = abilities::execute(kind, &target, acting, opponent, rng);
        debug!("ability {}: {}", kind.name(), outcome.message);

        // Rebroadcastable canonical form: resolved shots replace Auto. An
        // empty resolution keeps the Auto form, since an empty cell list has
        // no wire encoding; the replay resolves to the same empty volley
        // because both replicas share the tracking state.
        let applied = match (kind, &target) {
            (AbilityType::Multishot, AbilityTarget::Auto(_)) if !outcome.shots.is_empty() => {
                TurnAction::UseAbility {
                    kind,
                    target: AbilityTarget::Cells(outcome.shots.clone()),
                }
            }
            _ => action,
        };
        self.finish_turn(actor, outcome.message, applied)
    }

    /// Win check, then either terminal transition or turn flip.
    fn finish_turn(&mut self, actor: usize, message: String, applied: TurnAction) -> TurnResult {
        let opponent = actor ^ 1;
        if self.state.player(opponent).board.all_ships_destroyed() {
            self.state.end_game(actor);
            let name = self.state.player(actor).name.clone();
            return TurnResult {
                success: true,
                message: format!("{}. All enemy ships destroyed, {} wins!", message, name),
                winner: Some(actor),
                applied,
            };
        }
        self.state.next_turn();
        TurnResult {
            success: true,
            message,
            winner: None,
            applied,
        }
    }
}
