//! Code-based rendezvous: maps short join codes to host endpoints so a
//! client can find a host without knowing its address.
//!
//! Plain text, one newline-terminated request per connection:
//!
//! ```text
//! REG <code> <port>   ->  OK
//! GET <code>          ->  <ip> <port>  |  NF
//! anything else       ->  ERR
//! ```
//!
//! No expiry, no authentication, no collision detection on code generation:
//! a colliding code silently replaces the previous registration.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{anyhow, bail, Context, Result};
use dashmap::DashMap;
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

/// Join codes are 6 uppercase alphanumeric characters.
pub const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One registered host endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub ip: IpAddr,
    pub port: u16,
    pub created: SystemTime,
}

/// In-memory code registry. The map gives per-entry atomicity so unrelated
/// codes never serialize through one lock.
pub struct Rendezvous {
    registry: DashMap<String, Registration>,
}

impl Rendezvous {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registry: DashMap::new(),
        })
    }

    pub fn lookup_local(&self, code: &str) -> Option<Registration> {
        self.registry.get(code).map(|entry| entry.clone())
    }

    /// Answer one request line from a peer at `peer_ip`.
    pub fn handle_request(&self, peer_ip: IpAddr, line: &str) -> String {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("REG") => {
                let (code, port) = match (tokens.next(), tokens.next()) {
                    (Some(code), Some(port)) => (code, port),
                    _ => return "ERR".to_string(),
                };
                let port: u16 = match port.parse() {
                    Ok(p) => p,
                    Err(_) => return "ERR".to_string(),
                };
                // Replaces any prior entry under the same code.
                self.registry.insert(
                    code.to_string(),
                    Registration {
                        ip: peer_ip,
                        port,
                        created: SystemTime::now(),
                    },
                );
                info!("registered code {} -> {}:{}", code, peer_ip, port);
                "OK".to_string()
            }
            Some("GET") => match tokens.next() {
                Some(code) => match self.lookup_local(code) {
                    Some(reg) => format!("{} {}", reg.ip, reg.port),
                    None => "NF".to_string(),
                },
                None => "ERR".to_string(),
            },
            _ => "ERR".to_string(),
        }
    }

    /// Accept loop: one task per inbound connection.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        info!("rendezvous listening on {}", listener.local_addr()?);
        loop {
            let (stream, peer) = listener.accept().await.context("accepting request")?;
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = service.handle_connection(stream, peer.ip()).await {
                    warn!("request from {} failed: {}", peer, e);
                }
            });
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer_ip: IpAddr) -> Result<()> {
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let reply = self.handle_request(peer_ip, line.trim_end());
        write.write_all(reply.as_bytes()).await?;
        write.write_all(b"\n").await?;
        Ok(())
    }
}

/// Generate a join code. No uniqueness check: the caller overwrites any
/// colliding registration.
pub fn generate_code(rng: &mut SmallRng) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Register `code` for this host at the rendezvous service.
pub async fn register<A: ToSocketAddrs>(addr: A, code: &str, port: u16) -> Result<()> {
    let reply = request(addr, &format!("REG {} {}", code, port)).await?;
    if reply != "OK" {
        bail!("rendezvous rejected registration: {}", reply);
    }
    Ok(())
}

/// Resolve `code` to a host endpoint. `Ok(None)` means the code is unknown
/// (recoverable: mistyped or expired); an I/O failure is an error.
pub async fn lookup<A: ToSocketAddrs>(addr: A, code: &str) -> Result<Option<(IpAddr, u16)>> {
    let reply = request(addr, &format!("GET {}", code)).await?;
    if reply == "NF" {
        return Ok(None);
    }
    let mut tokens = reply.split_whitespace();
    let ip: IpAddr = tokens
        .next()
        .ok_or_else(|| anyhow!("malformed rendezvous reply '{}'", reply))?
        .parse()
        .with_context(|| format!("bad ip in rendezvous reply '{}'", reply))?;
    let port: u16 = tokens
        .next()
        .ok_or_else(|| anyhow!("malformed rendezvous reply '{}'", reply))?
        .parse()
        .with_context(|| format!("bad port in rendezvous reply '{}'", reply))?;
    Ok(Some((ip, port)))
}

async fn request<A: ToSocketAddrs>(addr: A, line: &str) -> Result<String> {
    let stream = TcpStream::connect(addr)
        .await
        .context("connecting to rendezvous service")?;
    let (read, mut write) = stream.into_split();
    write.write_all(line.as_bytes()).await?;
    write.write_all(b"\n").await?;
    let mut reader = BufReader::new(read);
    let mut reply = String::new();
    reader.read_line(&mut reply).await?;
    if reply.is_empty() {
        bail!("rendezvous service closed the connection");
    }
    Ok(reply.trim_end().to_string())
}
