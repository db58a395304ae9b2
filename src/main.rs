//! Auction Gym - Main binary
//!
//! Runs the auction house: agents connect on `/ws/{token}`, a runner starts a
//! game on `/ws_run/{token}`, and the scheduler plays one round per tick.
//!
//! ```text
//! ┌──────────┐  /ws_run   ┌──────────────────────┐   /ws   ┌──────────┐
//! │  Runner  │ ─────────> │  Auction house       │ <─────> │  Agents  │
//! └──────────┘  (arm)     │  scheduler + arena   │  bids   └──────────┘
//!                         └──────────────────────┘  rounds
//! ```

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use engine::{AuctionHouse, AuditSink, NullAudit};
use server::{Scheduler, ServerState, create_app};
use storage::JsonlAuditLog;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use config::GymConfig;

/// Auction Gym - sealed-bid dice auctions for competing agents
#[derive(Parser, Debug)]
#[command(name = "auction-gym")]
#[command(about = "Multi-agent sealed-bid dice auction game server")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "AH_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "AH_PORT")]
    port: Option<u16>,

    /// Token agents present on /ws/{token}
    #[arg(long, env = "AH_GAME_TOKEN")]
    game_token: Option<String>,

    /// Token the runner presents on /ws_run/{token}
    #[arg(long, env = "AH_PLAY_TOKEN")]
    play_token: Option<String>,

    /// Delay between rounds in milliseconds
    #[arg(long, env = "AH_TICK_MS")]
    tick_ms: Option<u64>,

    /// Directory for audit logs
    #[arg(long, env = "AH_LOG_DIR")]
    log_dir: Option<std::path::PathBuf>,

    /// Do not write audit logs
    #[arg(long, env = "AH_NO_AUDIT")]
    no_audit: bool,

    /// Seed the auction RNG for reproducible games
    #[arg(long, env = "AH_SEED")]
    seed: Option<u64>,
}

impl Args {
    /// Apply explicitly passed flags on top of the defaults.
    fn into_config(self) -> GymConfig {
        let mut config = GymConfig::default().audit(!self.no_audit);
        if let Some(host) = self.host {
            config = config.host(host);
        }
        if let Some(port) = self.port {
            config = config.port(port);
        }
        if let Some(token) = self.game_token {
            config = config.game_token(token);
        }
        if let Some(token) = self.play_token {
            config = config.play_token(token);
        }
        if let Some(ms) = self.tick_ms {
            config = config.tick_ms(ms);
        }
        if let Some(dir) = self.log_dir {
            config = config.log_dir(dir);
        }
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        config
    }
}

fn open_audit(config: &GymConfig) -> anyhow::Result<Arc<dyn AuditSink>> {
    if !config.audit {
        info!("audit log disabled");
        return Ok(Arc::new(NullAudit));
    }

    let log = JsonlAuditLog::open_next(&config.log_dir)
        .with_context(|| format!("opening audit log in {}", config.log_dir.display()))?;
    info!(
        rounds = %log.round_path().display(),
        identities = %log.identity_path().display(),
        "audit log open"
    );
    Ok(Arc::new(log))
}

fn build_house(config: &GymConfig) -> anyhow::Result<AuctionHouse> {
    let economy = &config.economy;
    info!(
        income = economy.gold_income,
        interest = economy.bank_interest.to_float(),
        cashback = economy.gold_back.to_float(),
        auctions_per_agent = economy.auctions_per_agent.to_float(),
        "economy"
    );

    let mut house = AuctionHouse::new(economy.clone())
        .context("invalid economy config")?
        .with_audit(open_audit(config)?);
    if let Some(seed) = config.seed {
        house = house.with_seed(seed);
    }
    Ok(house)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    let server_config = config.server_config();

    let house = build_house(&config)?;
    let state = ServerState::new(house, server_config.tokens.clone(), server_config.timeouts);

    tokio::spawn(Scheduler::new(state.arena.clone(), server_config.tick_interval).run());

    let addr = server_config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "auction house listening");

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
