//! Control channel: `GET /ws_run/{token}`
//!
//! The runner sends one [`ControlRequest`], receives a [`ControlResponse`]
//! naming the agent token and the current head count, and the game starts.
//! If the reply cannot be delivered the game stays unarmed.

use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};
use types::{ControlRequest, ControlResponse};

use crate::routes::read_json;
use crate::state::{ServerState, SharedArena};

/// WebSocket upgrade handler: `GET /ws_run/{token}`
pub async fn control_ws(
    ws: WebSocketUpgrade,
    Path(token): Path<String>,
    State(state): State<ServerState>,
) -> Response {
    if token != state.tokens.control {
        debug!("control connection refused: bad token");
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_control(socket, state))
}

async fn handle_control(mut socket: WebSocket, state: ServerState) {
    state.reset_if_done();

    let limit = state.timeouts.handshake;
    let Some(request) = read_json::<ControlRequest>(&mut socket, limit).await else {
        info!("game not started: no control request");
        return;
    };

    let response = configure_game(&state.arena, request, &state.tokens.agent);
    let payload = match serde_json::to_string(&response) {
        Ok(json) => Utf8Bytes::from(json),
        Err(e) => {
            warn!(error = %e, "failed to encode control response");
            return;
        }
    };

    let reply = socket.send(Message::Text(payload));
    if !matches!(tokio::time::timeout(state.timeouts.send, reply).await, Ok(Ok(()))) {
        info!("game not started: runner disconnected");
        return;
    }

    start_game(&state.arena);
    let _ = socket.send(Message::Close(None)).await;
}

/// Apply the round limit and build the reply for the runner.
pub fn configure_game(
    arena: &SharedArena,
    request: ControlRequest,
    agent_token: &str,
) -> ControlResponse {
    let mut arena = arena.lock();
    arena.house.set_round_limit(request.num_rounds);
    ControlResponse {
        game_token: agent_token.to_owned(),
        num_players: arena.house.agent_count(),
    }
}

/// Arm the game so the scheduler starts ticking.
pub fn start_game(arena: &SharedArena) {
    let mut arena = arena.lock();
    arena.house.arm();
    info!(
        rounds = arena.house.round_limit(),
        agents = arena.house.agent_count(),
        "game armed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{AuctionHouse, EconomyConfig, GamePhase};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use types::{AgentId, AgentIdentity, PlayerId};

    use crate::state::Arena;

    fn arena_with_agents(n: usize) -> SharedArena {
        let mut house = AuctionHouse::new(EconomyConfig::default()).unwrap();
        for i in 0..n {
            house.register_agent(AgentIdentity {
                player_id: PlayerId::from("p1"),
                agent_id: AgentId::from(format!("agent{i}")),
                name: format!("Bot {i}"),
            });
        }
        Arc::new(Mutex::new(Arena::new(house)))
    }

    #[test]
    fn test_configure_reports_token_and_head_count() {
        let arena = arena_with_agents(3);
        let response = configure_game(&arena, ControlRequest { num_rounds: 25 }, "play123");

        assert_eq!(response.game_token, "play123");
        assert_eq!(response.num_players, 3);

        let guard = arena.lock();
        assert_eq!(guard.house.round_limit(), 25);
        assert_eq!(guard.house.phase(), GamePhase::Inactive);
    }

    #[test]
    fn test_start_game_arms() {
        let arena = arena_with_agents(1);
        configure_game(&arena, ControlRequest { num_rounds: 2 }, "t");
        start_game(&arena);
        assert_eq!(arena.lock().house.phase(), GamePhase::Active);
    }

    #[test]
    fn test_response_wire_shape() {
        let arena = arena_with_agents(0);
        let response = configure_game(&arena, ControlRequest { num_rounds: 1 }, "tok");
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"game_token":"tok","num_players":0}"#);
    }
}
