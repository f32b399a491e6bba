//! Neo-Retro Battleship: two-player turn-based naval combat with an
//! optional limited-use ability system, peer synchronization over a
//! line-based wire protocol, and a code-based rendezvous service.

pub mod abilities;
pub mod agent;
pub mod engine;
pub mod grid;
mod logging;
pub mod protocol;
pub mod rendezvous;
pub mod session;

pub use abilities::{
    AbilityRule, AbilityStatus, AbilityTarget, AbilityType, PlayerAbilities, EMP_LOCK_TURNS,
    MULTISHOT_AUTO_SHOTS, SHIELD_MIN_LENGTH,
};
pub use agent::{HeuristicAgent, PlayerAgent};
pub use engine::{
    GameConfig, GameEngine, GameMode, GameState, PlayerState, TurnAction, TurnResult,
};
pub use grid::{
    random_fleet, Board, CellState, Coordinate, GridError, Orientation, Placement, Ship, ShipType,
    ShotOutcome, FLEET,
};
pub use logging::init_logging;
pub use protocol::{decode_action, encode_action, ProtocolError};
pub use rendezvous::{generate_code, Rendezvous, CODE_LEN};
pub use session::{
    host_accept, run_client, run_host, GameOutcome, InMemoryLineChannel, LineChannel,
    TcpLineChannel,
};
