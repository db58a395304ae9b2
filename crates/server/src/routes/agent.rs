//! Agent channel: `GET /ws/{token}`
//!
//! # Protocol
//!
//! 1. The agent sends an [`AgentHandshake`]. A malformed or invalid handshake
//!    closes the socket without a reply.
//! 2. The house sends a [`types::RoundState`] every tick while a game runs.
//! 3. The agent sends [`BidSubmission`]s at any time. Each entry is applied
//!    on its own; rejected entries are dropped silently.
//!
//! The channel ends when the agent disconnects, sends a payload that is not a
//! bid mapping, stalls a send past the timeout, or the game finishes.

use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};
use types::{AgentHandshake, AgentId, AgentIdentity, AuctionId, BidSubmission};

use crate::registry::ConnectionId;
use crate::routes::read_json;
use crate::state::{ServerState, SharedArena};

/// WebSocket upgrade handler: `GET /ws/{token}`
pub async fn agent_ws(
    ws: WebSocketUpgrade,
    Path(token): Path<String>,
    State(state): State<ServerState>,
) -> Response {
    if token != state.tokens.agent {
        debug!("agent connection refused: bad token");
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_agent(socket, state))
}

async fn handle_agent(mut socket: WebSocket, state: ServerState) {
    state.reset_if_done();

    let limit = state.timeouts.handshake;
    let Some(handshake) = read_json::<AgentHandshake>(&mut socket, limit).await else {
        return;
    };
    let identity = match handshake.validate() {
        Ok(identity) => identity,
        Err(e) => {
            debug!(error = %e, "agent handshake refused");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let agent_id = identity.agent_id.clone();
    let (conn, outbound) = admit(&state.arena, identity);
    debug!(agent = %agent_id, %conn, "agent channel open");

    let (sender, receiver) = socket.split();
    let mut send_task = tokio::spawn(forward_rounds(sender, outbound, state.timeouts.send, conn));
    let mut recv_task = tokio::spawn(read_bids(receiver, state.arena.clone(), agent_id.clone()));

    // Wait for either side to finish, then stop the other
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.arena.lock().connections.remove(conn);
    info!(agent = %agent_id, "agent disconnected");
}

/// Register the agent with the house, then its channel with the registry.
pub fn admit(
    arena: &SharedArena,
    identity: AgentIdentity,
) -> (ConnectionId, mpsc::Receiver<Utf8Bytes>) {
    let mut arena = arena.lock();
    arena.house.register_agent(identity);
    arena.connections.add()
}

/// Apply every entry of a submission in order. Returns how many were accepted.
pub fn apply_bids(arena: &SharedArena, agent_id: &AgentId, submission: &BidSubmission) -> usize {
    let mut arena = arena.lock();
    let mut accepted = 0;

    for (key, gold) in submission.iter() {
        let Ok(auction) = key.parse::<AuctionId>() else {
            debug!(agent = %agent_id, key, "bid on malformed auction id ignored");
            continue;
        };
        match arena.house.accept_bid(agent_id, &auction, gold) {
            Ok(()) => accepted += 1,
            Err(reason) => debug!(agent = %agent_id, %reason, "bid rejected"),
        }
    }

    accepted
}

/// Drain the outbound queue into the socket.
async fn forward_rounds(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
    limit: Duration,
    conn: ConnectionId,
) {
    while let Some(payload) = outbound.recv().await {
        match tokio::time::timeout(limit, sender.send(Message::Text(payload))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(%conn, error = %e, "send failed");
                return;
            }
            Err(_) => {
                debug!(%conn, "send timed out");
                return;
            }
        }
    }

    // The registry let go of this channel: the game is over
    let _ = tokio::time::timeout(limit, sender.send(Message::Close(None))).await;
}

/// Read bid submissions until the agent goes away or sends garbage.
async fn read_bids(mut receiver: SplitStream<WebSocket>, arena: SharedArena, agent_id: AgentId) {
    while let Some(msg) = receiver.next().await {
        let submission = match msg {
            Ok(Message::Text(text)) => serde_json::from_str::<BidSubmission>(text.as_str()),
            Ok(Message::Binary(bytes)) => serde_json::from_slice::<BidSubmission>(&bytes),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(agent = %agent_id, error = %e, "agent channel error");
                break;
            }
        };

        match submission {
            Ok(submission) => {
                apply_bids(&arena, &agent_id, &submission);
            }
            Err(e) => {
                debug!(agent = %agent_id, error = %e, "malformed bid payload");
                break;
            }
        }
    }
}
