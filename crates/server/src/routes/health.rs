//! Liveness endpoint: `GET /health`

use axum::Json;
use axum::extract::State;
use engine::GamePhase;
use serde::Serialize;

use crate::state::ServerState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub phase: GamePhase,
    pub round: u64,
    pub agents: usize,
    /// Open agent channels.
    pub connections: usize,
    pub uptime_secs: u64,
}

/// Liveness check: always 200 while the server is up.
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let arena = state.arena.lock();

    Json(HealthResponse {
        status: "healthy",
        phase: arena.house.phase(),
        round: arena.house.round(),
        agents: arena.house.agent_count(),
        connections: arena.connections.len(),
        uptime_secs: state.uptime_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            phase: GamePhase::Active,
            round: 7,
            agents: 4,
            connections: 3,
            uptime_secs: 60,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"phase\":\"active\""));
        assert!(json.contains("\"round\":7"));
    }
}
