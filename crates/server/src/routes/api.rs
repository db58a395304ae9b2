//! Read-only REST endpoints.
//!
//! # Endpoints
//!
//! - `GET /api/status` - Game phase and counters
//! - `GET /api/standings` - Graded leaderboard
//! - `GET /api/agents/{agent_id}` - One agent's identity and balances

use axum::Json;
use axum::extract::{Path, State};
use engine::{GamePhase, Standing};
use serde::Serialize;
use types::{AgentId, PlayerId};

use crate::error::{AppError, AppResult};
use crate::state::ServerState;

/// Game status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub phase: GamePhase,
    /// Rounds played so far.
    pub round: u64,
    pub round_limit: u64,
    pub agents: usize,
    pub connections: usize,
    /// Open auctions in the current round.
    pub open_auctions: usize,
}

/// Get game status: `GET /api/status`
pub async fn get_status(State(state): State<ServerState>) -> Json<StatusResponse> {
    let arena = state.arena.lock();

    Json(StatusResponse {
        phase: arena.house.phase(),
        round: arena.house.round(),
        round_limit: arena.house.round_limit(),
        agents: arena.house.agent_count(),
        connections: arena.connections.len(),
        open_auctions: arena.house.open_auctions().count(),
    })
}

/// Get the leaderboard: `GET /api/standings`
pub async fn get_standings(State(state): State<ServerState>) -> Json<Vec<Standing>> {
    Json(state.arena.lock().house.standings())
}

/// Agent detail response.
#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub agent_id: AgentId,
    pub name: String,
    pub player_id: PlayerId,
    pub gold: u64,
    pub points: i64,
}

/// Get one agent: `GET /api/agents/{agent_id}`
pub async fn get_agent(
    State(state): State<ServerState>,
    Path(agent_id): Path<String>,
) -> AppResult<Json<AgentResponse>> {
    let arena = state.arena.lock();
    let agent = arena
        .house
        .agent(&AgentId::from(agent_id.as_str()))
        .ok_or_else(|| AppError::NotFound(format!("agent {agent_id}")))?;

    Ok(Json(AgentResponse {
        agent_id: agent.identity.agent_id.clone(),
        name: agent.identity.name.clone(),
        player_id: agent.identity.player_id.clone(),
        gold: agent.gold,
        points: agent.points,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_serialization() {
        let response = StatusResponse {
            phase: GamePhase::Inactive,
            round: 0,
            round_limit: 10,
            agents: 2,
            connections: 2,
            open_auctions: 0,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"phase\":\"inactive\""));
        assert!(json.contains("\"round_limit\":10"));
    }
}
