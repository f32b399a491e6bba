use neoretro::{
    CellState, Coordinate, GameConfig, GameState, HeuristicAgent, Orientation, Placement,
    PlayerAgent, ShipType, TurnAction,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn classic_state() -> GameState {
    let mut state = GameState::new(GameConfig::classic(10, 10), "P1", "P2");
    for idx in 0..2 {
        state.player_mut(idx).board.place(Placement {
            kind: ShipType::Destroyer,
            row: 0,
            col: 0,
            orientation: Orientation::Horizontal,
        });
    }
    state
}

#[test]
fn test_hunt_mode_uses_checkerboard_parity() {
    let state = classic_state();
    let mut agent = HeuristicAgent::new();

    for seed in 0..20 {
        let mut rng = SmallRng::seed_from_u64(seed);
        match agent.choose_action(&mut rng, &state, true) {
            TurnAction::Fire(c) => {
                assert!(c.row < 10 && c.col < 10);
                assert_eq!((c.row + c.col) % 2, 0, "hunt shot at {} off parity", c);
            }
            other => panic!("classic mode must fire, got {:?}", other),
        }
    }
}

#[test]
fn test_target_mode_finishes_damaged_ships() {
    let mut state = classic_state();
    state
        .player_mut(0)
        .tracking
        .set_cell(Coordinate::new(5, 5), CellState::Hit);
    let neighbors = [
        Coordinate::new(4, 5),
        Coordinate::new(6, 5),
        Coordinate::new(5, 4),
        Coordinate::new(5, 6),
    ];

    let mut agent = HeuristicAgent::new();
    for seed in 0..20 {
        let mut rng = SmallRng::seed_from_u64(seed);
        match agent.choose_action(&mut rng, &state, true) {
            TurnAction::Fire(c) => {
                assert!(neighbors.contains(&c), "{} is not next to the hit", c)
            }
            other => panic!("classic mode must fire, got {:?}", other),
        }
    }
}

#[test]
fn test_target_mode_skips_resolved_neighbors() {
    let mut state = classic_state();
    state
        .player_mut(0)
        .tracking
        .set_cell(Coordinate::new(5, 5), CellState::Hit);
    // Three neighbors already resolved: only (5, 6) is left.
    state
        .player_mut(0)
        .tracking
        .set_cell(Coordinate::new(4, 5), CellState::Miss);
    state
        .player_mut(0)
        .tracking
        .set_cell(Coordinate::new(6, 5), CellState::Miss);
    state
        .player_mut(0)
        .tracking
        .set_cell(Coordinate::new(5, 4), CellState::Hit);

    let mut agent = HeuristicAgent::new();
    for seed in 0..10 {
        let mut rng = SmallRng::seed_from_u64(seed);
        match agent.choose_action(&mut rng, &state, true) {
            TurnAction::Fire(c) => {
                // (5, 4) is itself a hit, so its own empty neighbors also
                // qualify as candidates.
                let candidates = [
                    Coordinate::new(5, 6),
                    Coordinate::new(4, 4),
                    Coordinate::new(6, 4),
                    Coordinate::new(5, 3),
                ];
                assert!(candidates.contains(&c), "unexpected target {}", c);
            }
            other => panic!("classic mode must fire, got {:?}", other),
        }
    }
}

#[test]
fn test_agent_drives_a_game_to_completion() {
    use neoretro::{random_fleet, GameEngine};

    let mut rng = SmallRng::seed_from_u64(42);
    let mut state = GameState::new(GameConfig::enhanced(10, 10), "P1", "P2");
    for idx in 0..2 {
        random_fleet(&mut rng, &mut state.player_mut(idx).board).unwrap();
    }
    let mut engine = GameEngine::new(state);
    let mut agents = [HeuristicAgent::new(), HeuristicAgent::new()];

    let mut guard = 0;
    while !engine.state().is_over() {
        guard += 1;
        assert!(guard < 2000, "game should terminate");
        let current = engine.state().current_player();
        let action = agents[current].choose_action(&mut rng, engine.state(), current == 0);
        let _ = engine.process_turn(&mut rng, action);
    }
    assert!(engine.state().winner().is_some());
}
