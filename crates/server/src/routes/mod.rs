//! Route handlers for the server.
//!
//! # Modules
//!
//! - [`agent`]: agent channel (handshake, then bids in and rounds out)
//! - [`control`]: control channel (configure and start a game)
//! - [`health`]: liveness endpoint
//! - [`api`]: read-only game status and standings

pub mod agent;
pub mod api;
pub mod control;
pub mod health;

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Read the first JSON message from a fresh socket.
///
/// Ping/pong frames are skipped. Returns `None` if the peer closes, sends
/// something that does not parse as `T`, or stays silent past `limit`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    socket: &mut WebSocket,
    limit: Duration,
) -> Option<T> {
    let first = tokio::time::timeout(limit, async {
        loop {
            match socket.recv().await? {
                Ok(Message::Text(text)) => return Some(serde_json::from_str::<T>(text.as_str())),
                Ok(Message::Binary(bytes)) => return Some(serde_json::from_slice::<T>(&bytes)),
                Ok(Message::Ping(_) | Message::Pong(_)) => continue,
                Ok(Message::Close(_)) | Err(_) => return None,
            }
        }
    })
    .await;

    match first {
        Ok(Some(Ok(value))) => Some(value),
        Ok(Some(Err(e))) => {
            debug!(error = %e, "malformed handshake");
            None
        }
        Ok(None) => None,
        Err(_) => {
            debug!(timeout_ms = limit.as_millis() as u64, "no handshake before timeout");
            None
        }
    }
}
