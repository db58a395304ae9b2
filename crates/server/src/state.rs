//! Shared server state.
//!
//! The auction house and the connection registry live together in one
//! [`Arena`] behind a single mutex. Every game mutation and every registry
//! change happens while holding that lock, and nothing awaits while holding
//! it, so each bid, tick, and (dis)connect is one atomic step relative to all
//! other tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use engine::AuctionHouse;
use parking_lot::Mutex;

use crate::registry::ConnectionRegistry;

/// The single game instance and the channels watching it.
#[derive(Debug)]
pub struct Arena {
    pub house: AuctionHouse,
    pub connections: ConnectionRegistry,
}

impl Arena {
    pub fn new(house: AuctionHouse) -> Self {
        Self {
            house,
            connections: ConnectionRegistry::new(),
        }
    }
}

/// Arena handle shared by handlers and the scheduler.
pub type SharedArena = Arc<Mutex<Arena>>;

/// Path tokens that gate the two channel types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokens {
    /// Agents join with `/ws/{agent}`.
    pub agent: String,
    /// The runner starts games with `/ws_run/{control}`.
    pub control: String,
}

impl Default for AccessTokens {
    fn default() -> Self {
        Self {
            agent: "play123".into(),
            control: "play123".into(),
        }
    }
}

/// Per-connection time limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTimeouts {
    /// Time a peer has to send its first message.
    pub handshake: Duration,
    /// Time a single outbound frame may take before the peer is dropped.
    pub send: Duration,
}

impl Default for ChannelTimeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(10),
            send: Duration::from_secs(1),
        }
    }
}

/// Shared state for all route handlers.
///
/// Cloned into each handler via Axum's State extractor.
#[derive(Clone)]
pub struct ServerState {
    pub arena: SharedArena,
    pub tokens: Arc<AccessTokens>,
    pub timeouts: ChannelTimeouts,
    pub start_time: Instant,
}

impl ServerState {
    pub fn new(house: AuctionHouse, tokens: AccessTokens, timeouts: ChannelTimeouts) -> Self {
        Self {
            arena: Arc::new(Mutex::new(Arena::new(house))),
            tokens: Arc::new(tokens),
            timeouts,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Start a fresh game if the last one is over.
    pub fn reset_if_done(&self) -> bool {
        self.arena.lock().house.reset_if_done()
    }
}
