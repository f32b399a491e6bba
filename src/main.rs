use anyhow::{anyhow, Result};
use clap::Parser;
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use neoretro::{
    generate_code, host_accept, init_logging, rendezvous, run_client, run_host, GameConfig,
    GameEngine, GameState, HeuristicAgent, PlayerAgent, Rendezvous, TcpLineChannel,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Play an AI vs AI game on this machine.
    Local {
        #[arg(long, help = "Fix RNG seed for reproducible games")]
        seed: Option<u64>,
        #[arg(long, help = "Enable the enhanced ability mode")]
        enhanced: bool,
    },
    /// Host a networked game behind a join code.
    Host {
        #[arg(long, default_value = "127.0.0.1:35600")]
        rendezvous: String,
        #[arg(long, default_value = "0.0.0.0:0")]
        bind: String,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        enhanced: bool,
    },
    /// Join a hosted game by code.
    Join {
        /// Join code printed by the host.
        code: String,
        #[arg(long, default_value = "127.0.0.1:35600")]
        rendezvous: String,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        enhanced: bool,
    },
    /// Run the rendezvous (matchmaking) service.
    Rendezvous {
        #[arg(long, default_value = "0.0.0.0:35600")]
        bind: String,
    },
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

fn make_config(enhanced: bool) -> GameConfig {
    if enhanced {
        GameConfig::enhanced(10, 10)
    } else {
        GameConfig::classic(10, 10)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Local { seed, enhanced } => {
            let mut rng = make_rng(seed);
            let config = make_config(enhanced);
            let mut engine = GameEngine::new(GameState::new(config, "Player 1", "Player 2"));
            for idx in 0..2 {
                neoretro::random_fleet(&mut rng, &mut engine.state_mut().player_mut(idx).board)
                    .map_err(|e| anyhow!(e))?;
            }
            let mut agents = [HeuristicAgent::new(), HeuristicAgent::new()];
            let mut turns = 0usize;
            while !engine.state().is_over() {
                let current = engine.state().current_player();
                let action =
                    agents[current].choose_action(&mut rng, engine.state(), current == 0);
                let result = engine.process_turn(&mut rng, action);
                if result.success {
                    turns += 1;
                    info!("{}", result.message);
                }
            }
            let winner = engine
                .state()
                .winner()
                .ok_or_else(|| anyhow!("game over without a winner"))?;
            println!(
                "{} wins after {} turns",
                engine.state().player(winner).name,
                turns
            );
        }
        Commands::Host {
            rendezvous,
            bind,
            seed,
            enhanced,
        } => {
            let mut rng = make_rng(seed);
            let listener = TcpListener::bind(&bind).await?;
            let port = listener.local_addr()?.port();
            let code = generate_code(&mut rng);
            neoretro::rendezvous::register(&rendezvous, &code, port).await?;
            println!("Hosting on port {}. Join code: {}", port, code);

            let (ready_tx, _ready_rx) = oneshot::channel();
            let mut chan = host_accept(listener, ready_tx).await?;
            let mut agent = HeuristicAgent::new();
            let outcome = run_host(
                &mut chan,
                make_config(enhanced),
                &mut agent,
                &mut rng,
                "Host",
                "Challenger",
            )
            .await?;
            println!(
                "Game over: {} wins after {} turns",
                if outcome.winner == 0 { "Host" } else { "Challenger" },
                outcome.turns
            );
        }
        Commands::Join {
            code,
            rendezvous: rendezvous_addr,
            seed,
            enhanced,
        } => {
            let mut rng = make_rng(seed);
            let endpoint = rendezvous::lookup(&rendezvous_addr, &code)
                .await?
                .ok_or_else(|| anyhow!("join code {} not found", code))?;
            println!("Code {} resolves to {}:{}", code, endpoint.0, endpoint.1);
            let mut chan = TcpLineChannel::connect((endpoint.0, endpoint.1)).await?;
            let mut agent = HeuristicAgent::new();
            let outcome = run_client(
                &mut chan,
                make_config(enhanced),
                &mut agent,
                &mut rng,
                "Host",
                "Challenger",
            )
            .await?;
            println!(
                "Game over: {} wins after {} turns",
                if outcome.winner == 0 { "Host" } else { "Challenger" },
                outcome.turns
            );
        }
        Commands::Rendezvous { bind } => {
            let listener = TcpListener::bind(&bind).await?;
            let service = Rendezvous::new();
            service.serve(listener).await?;
        }
    }
    Ok(())
}
