//! Central configuration for the auction gym process.
//!
//! Everything that can be tuned from the command line lands here first and
//! is then split into the engine's economy and the server's settings.

use std::path::PathBuf;
use std::time::Duration;

use engine::EconomyConfig;
use server::{AccessTokens, ChannelTimeouts, ServerConfig};

/// Master configuration for one server process.
#[derive(Debug, Clone)]
pub struct GymConfig {
    // ─────────────────────────────────────────────────────────────────────────
    // Network
    // ─────────────────────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    /// Token agents present on `/ws/{token}`.
    pub game_token: String,
    /// Token the runner presents on `/ws_run/{token}`.
    pub play_token: String,
    /// Seconds a peer has to send its handshake.
    pub handshake_timeout_secs: u64,

    // ─────────────────────────────────────────────────────────────────────────
    // Game
    // ─────────────────────────────────────────────────────────────────────────
    /// Delay between rounds in milliseconds.
    pub tick_ms: u64,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub economy: EconomyConfig,

    // ─────────────────────────────────────────────────────────────────────────
    // Audit
    // ─────────────────────────────────────────────────────────────────────────
    /// Directory for the JSON-lines audit files.
    pub log_dir: PathBuf,
    /// Write audit files at all.
    pub audit: bool,
}

impl Default for GymConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8001,
            game_token: "play123".into(),
            play_token: "play123".into(),
            handshake_timeout_secs: 10,
            tick_ms: 100,
            seed: None,
            economy: EconomyConfig::default(),
            log_dir: PathBuf::from("."),
            audit: true,
        }
    }
}

impl GymConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn game_token(mut self, token: impl Into<String>) -> Self {
        self.game_token = token.into();
        self
    }

    pub fn play_token(mut self, token: impl Into<String>) -> Self {
        self.play_token = token.into();
        self
    }

    pub fn tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = ms;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn audit(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    /// Server settings derived from this config.
    ///
    /// A zero tick is raised to one millisecond so the scheduler never spins.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            tokens: AccessTokens {
                agent: self.game_token.clone(),
                control: self.play_token.clone(),
            },
            timeouts: ChannelTimeouts {
                handshake: Duration::from_secs(self.handshake_timeout_secs),
                ..ChannelTimeouts::default()
            },
            tick_interval: Duration::from_millis(self.tick_ms.max(1)),
        }
    }
}
