//! Peer synchronization: turns two independently-running engine instances
//! into one game over a line-based channel.
//!
//! The host (player 1, index 0) is authoritative: every action, its own and
//! the client's, is applied to the host engine first and the canonical result
//! is broadcast back. The client never resolves host turns locally; it
//! replays the broadcast action through its own engine and trusts the host's
//! OVER verdict verbatim. There is no cheat protection on this path.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use crate::agent::PlayerAgent;
use crate::engine::{GameConfig, GameEngine, GameState, TurnResult};
use crate::grid::{random_fleet, Orientation, Placement, ShipType};
use crate::protocol::{
    decode_action, encode_action, APPLY, CONFIG, HELLO, MODE, MOVE, MSG, OVER, PLACE, READY,
    READY_END, STATE_END,
};

/// Newline-framed text channel between two peers. Receives block with no
/// timeout; a closed peer surfaces as an error, which is fatal to the
/// session.
#[async_trait]
pub trait LineChannel: Send {
    async fn send_line(&mut self, line: &str) -> Result<()>;
    async fn recv_line(&mut self) -> Result<String>;
}

/// TCP-backed channel, one UTF-8 line per message.
pub struct TcpLineChannel {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TcpLineChannel {
    pub fn new(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .context("connecting to host")?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl LineChannel for TcpLineChannel {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    async fn recv_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            bail!("peer closed the connection");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Paired in-process channels for deterministic session tests.
pub struct InMemoryLineChannel {
    tx: UnboundedSender<String>,
    rx: UnboundedReceiver<String>,
}

impl InMemoryLineChannel {
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = unbounded_channel();
        let (tx_b, rx_b) = unbounded_channel();
        (Self { tx: tx_a, rx: rx_b }, Self { tx: tx_b, rx: rx_a })
    }
}

#[async_trait]
impl LineChannel for InMemoryLineChannel {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.tx
            .send(line.to_string())
            .map_err(|_| anyhow!("peer channel closed"))
    }

    async fn recv_line(&mut self) -> Result<String> {
        self.rx.recv().await.ok_or_else(|| anyhow!("peer channel closed"))
    }
}

/// Bind-side accept with a one-shot readiness gate: the bound address is
/// announced before blocking in accept so callers can wait without polling.
pub async fn host_accept(
    listener: TcpListener,
    ready: oneshot::Sender<std::net::SocketAddr>,
) -> Result<TcpLineChannel> {
    let addr = listener.local_addr()?;
    // The receiver may have gone away; hosting proceeds regardless.
    let _ = ready.send(addr);
    let (stream, peer) = listener.accept().await.context("accepting peer")?;
    info!("peer connected from {}", peer);
    Ok(TcpLineChannel::new(stream))
}

/// How a finished networked game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    /// Index of the winning side (0 = host, 1 = client).
    pub winner: usize,
    /// Successful turns processed locally.
    pub turns: usize,
}

/// Run the authoritative side of a networked game.
pub async fn run_host<C: LineChannel + ?Sized>(
    chan: &mut C,
    config: GameConfig,
    agent: &mut dyn PlayerAgent,
    rng: &mut SmallRng,
    host_name: &str,
    client_name: &str,
) -> Result<GameOutcome> {
    // Greeting pair, client speaks first.
    let hello = chan.recv_line().await?;
    if hello != HELLO {
        bail!("handshake mismatch: expected '{}', got '{}'", HELLO, hello);
    }
    chan.send_line(HELLO).await?;

    chan.send_line(&format!("{} {} {}", CONFIG, config.rows, config.cols))
        .await?;
    chan.send_line(&format!("{} {}", MODE, config.mode.name()))
        .await?;

    let mut engine = GameEngine::new(GameState::new(config, host_name, client_name));
    let placements = random_fleet(rng, &mut engine.state_mut().player_mut(0).board)
        .map_err(|e| anyhow!(e))?;
    send_placements(chan, "P1", &placements).await?;
    let theirs = recv_placements(chan, "P2").await?;
    apply_placements(&mut engine, 1, &theirs)?;
    info!("placement exchange complete, game on");

    let mut turns = 0usize;
    loop {
        if engine.state().is_over() {
            break;
        }
        let result = if engine.state().current_player() == 0 {
            // Our turn: keep asking the agent until the engine accepts.
            loop {
                let action = agent.choose_action(rng, engine.state(), true);
                let result = engine.process_turn(rng, action);
                if result.success {
                    break result;
                }
                debug!("host action rejected: {}", result.message);
            }
        } else {
            // Client's turn: apply its relayed action verbatim. A rejected
            // action is still broadcast; the replay rejects identically on
            // the client, which then picks again.
            let line = chan.recv_line().await?;
            let encoded = strip_token(&line, MOVE)?;
            let action = decode_action(encoded)?;
            engine.process_turn(rng, action)
        };
        if result.success {
            turns += 1;
        }
        broadcast(chan, &result).await?;
    }

    let winner = engine
        .state()
        .winner()
        .ok_or_else(|| anyhow!("game over without a winner"))?;
    Ok(GameOutcome { winner, turns })
}

/// Run the non-authoritative side of a networked game.
pub async fn run_client<C: LineChannel + ?Sized>(
    chan: &mut C,
    config: GameConfig,
    agent: &mut dyn PlayerAgent,
    rng: &mut SmallRng,
    host_name: &str,
    client_name: &str,
) -> Result<GameOutcome> {
    chan.send_line(HELLO).await?;
    let hello = chan.recv_line().await?;
    if hello != HELLO {
        bail!("handshake mismatch: expected '{}', got '{}'", HELLO, hello);
    }

    let line = chan.recv_line().await?;
    let dims = strip_token(&line, CONFIG)?;
    let mut it = dims.split_whitespace();
    let rows: usize = it
        .next()
        .ok_or_else(|| anyhow!("missing rows in CONFIG"))?
        .parse()
        .context("bad rows in CONFIG")?;
    let cols: usize = it
        .next()
        .ok_or_else(|| anyhow!("missing cols in CONFIG"))?
        .parse()
        .context("bad cols in CONFIG")?;
    let line = chan.recv_line().await?;
    let mode = strip_token(&line, MODE)?;
    if rows != config.rows || cols != config.cols || mode != config.mode.name() {
        bail!(
            "configuration mismatch: host plays {}x{} {}, we expect {}x{} {}",
            rows,
            cols,
            mode,
            config.rows,
            config.cols,
            config.mode.name()
        );
    }

    let mut engine = GameEngine::new(GameState::new(config, host_name, client_name));
    let theirs = recv_placements(chan, "P1").await?;
    apply_placements(&mut engine, 0, &theirs)?;
    let placements = random_fleet(rng, &mut engine.state_mut().player_mut(1).board)
        .map_err(|e| anyhow!(e))?;
    send_placements(chan, "P2", &placements).await?;
    info!("placement exchange complete, game on");

    let mut turns = 0usize;
    loop {
        if engine.state().is_over() {
            break;
        }
        if engine.state().current_player() == 1 {
            let action = agent.choose_action(rng, engine.state(), false);
            chan.send_line(&format!("{} {}", MOVE, encode_action(&action)))
                .await?;
        }
        // Whether the move was ours or the host's, the authoritative result
        // arrives as one broadcast block.
        if replay_broadcast(chan, &mut engine, rng).await? {
            turns += 1;
        }
    }

    let winner = engine
        .state()
        .winner()
        .ok_or_else(|| anyhow!("game over without a winner"))?;
    Ok(GameOutcome { winner, turns })
}

/// Send one side's full fleet placement.
async fn send_placements<C: LineChannel + ?Sized>(
    chan: &mut C,
    side: &str,
    placements: &[Placement],
) -> Result<()> {
    chan.send_line(&format!("{} {}", READY, side)).await?;
    for p in placements {
        let orient = match p.orientation {
            Orientation::Horizontal => "H",
            Orientation::Vertical => "V",
        };
        chan.send_line(&format!(
            "{} {} {} {} {}",
            PLACE,
            p.kind.name(),
            p.row,
            p.col,
            orient
        ))
        .await?;
    }
    chan.send_line(READY_END).await
}

/// Receive one side's full fleet placement block.
async fn recv_placements<C: LineChannel + ?Sized>(
    chan: &mut C,
    side: &str,
) -> Result<Vec<Placement>> {
    let line = chan.recv_line().await?;
    let got = strip_token(&line, READY)?;
    if got != side {
        bail!("expected placements for {}, got {}", side, got);
    }
    let mut placements = Vec::new();
    loop {
        let line = chan.recv_line().await?;
        if line == READY_END {
            return Ok(placements);
        }
        let rest = strip_token(&line, PLACE)?;
        let mut it = rest.split_whitespace();
        let kind = ShipType::from_name(
            it.next().ok_or_else(|| anyhow!("missing ship in PLACE"))?,
        )
        .map_err(|e| anyhow!(e))?;
        let row: usize = it
            .next()
            .ok_or_else(|| anyhow!("missing row in PLACE"))?
            .parse()
            .context("bad row in PLACE")?;
        let col: usize = it
            .next()
            .ok_or_else(|| anyhow!("missing col in PLACE"))?
            .parse()
            .context("bad col in PLACE")?;
        let orientation = match it.next() {
            Some("H") => Orientation::Horizontal,
            Some("V") => Orientation::Vertical,
            other => bail!("bad orientation {:?} in PLACE", other),
        };
        placements.push(Placement {
            kind,
            row,
            col,
            orientation,
        });
    }
}

/// Apply a remote fleet to the given side, validating each placement.
fn apply_placements(engine: &mut GameEngine, side: usize, placements: &[Placement]) -> Result<()> {
    let board = &mut engine.state_mut().player_mut(side).board;
    for p in placements {
        if !board.can_place(*p) {
            bail!("illegal remote placement of {} at ({}, {})", p.kind.name(), p.row, p.col);
        }
        board.place(*p);
    }
    Ok(())
}

/// Host-side broadcast of one applied turn: the canonical action, the
/// player-facing message, the win marker and a terminator.
async fn broadcast<C: LineChannel + ?Sized>(chan: &mut C, result: &TurnResult) -> Result<()> {
    chan.send_line(&format!("{} {}", APPLY, encode_action(&result.applied)))
        .await?;
    chan.send_line(&format!("{} {}", MSG, result.message)).await?;
    let marker = match result.winner {
        Some(0) => "P1",
        Some(_) => "P2",
        None => "NONE",
    };
    chan.send_line(&format!("{} {}", OVER, marker)).await?;
    chan.send_line(STATE_END).await
}

/// Client-side replay of one broadcast block. Returns whether the replayed
/// action was accepted locally.
async fn replay_broadcast<C: LineChannel + ?Sized>(
    chan: &mut C,
    engine: &mut GameEngine,
    rng: &mut SmallRng,
) -> Result<bool> {
    let line = chan.recv_line().await?;
    let action = decode_action(strip_token(&line, APPLY)?)?;
    let line = chan.recv_line().await?;
    let message = strip_token(&line, MSG)?;
    info!("{}", message);
    let line = chan.recv_line().await?;
    let marker = strip_token(&line, OVER)?.to_string();
    let line = chan.recv_line().await?;
    if line != STATE_END {
        bail!("expected {}, got '{}'", STATE_END, line);
    }

    let result = engine.process_turn(rng, action);
    if !result.success {
        debug!("replayed action rejected locally: {}", result.message);
    }
    // The host verdict is ground truth even if our replay disagrees.
    match marker.as_str() {
        "NONE" => {}
        "P1" | "P2" => {
            let winner = if marker == "P1" { 0 } else { 1 };
            if !engine.state().is_over() {
                warn!("host declared game over; accepting its verdict");
                engine.state_mut().end_game(winner);
            }
        }
        other => bail!("bad OVER marker '{}'", other),
    }
    Ok(result.success)
}

fn strip_token<'a>(line: &'a str, token: &str) -> Result<&'a str> {
    if line == token {
        return Ok("");
    }
    line.strip_prefix(token)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(|| anyhow!("expected {} line, got '{}'", token, line))
}
