//! Axum application builder.
//!
//! # Routes
//!
//! - `GET /ws/{token}` - Agent channel (WebSocket)
//! - `GET /ws_run/{token}` - Control channel (WebSocket)
//! - `GET /health` - Liveness check
//! - `GET /api/status` - Game status
//! - `GET /api/standings` - Leaderboard
//! - `GET /api/agents/{agent_id}` - Agent detail

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::{agent, api, control, health};
use crate::scheduler::DEFAULT_TICK_INTERVAL;
use crate::state::{AccessTokens, ChannelTimeouts, ServerState};

/// Create the Axum application with all routes.
pub fn create_app(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        // Game channels
        .route("/ws/{token}", get(agent::agent_ws))
        .route("/ws_run/{token}", get(control::control_ws))
        // Health
        .route("/health", get(health::health))
        // Read-only API
        .route("/api/status", get(api::get_status))
        .route("/api/standings", get(api::get_standings))
        .route("/api/agents/{agent_id}", get(api::get_agent))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    pub tokens: AccessTokens,
    pub timeouts: ChannelTimeouts,
    /// Time between scheduler ticks.
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8001,
            tokens: AccessTokens::default(),
            timeouts: ChannelTimeouts::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Get bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
