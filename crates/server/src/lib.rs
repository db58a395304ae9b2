//! Server crate: the network face of the auction gym.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  tick   ┌───────────────────────────┐
//! │  Scheduler       │────────>│  Arena (one mutex)        │
//! │  (interval task) │         │   AuctionHouse            │
//! └──────────────────┘         │   ConnectionRegistry ─────┼──> per-agent queues
//!                              └───────────────────────────┘         │
//!        agent bids ──────────────────────^                           v
//!                                                            writer tasks -> sockets
//! ```
//!
//! # Modules
//!
//! - [`app`]: Axum router and server configuration
//! - [`state`]: Shared state (arena, tokens, timeouts)
//! - [`registry`]: Per-agent outbound queues and broadcast
//! - [`scheduler`]: The periodic round tick
//! - [`routes`]: WebSocket channels and REST handlers
//! - [`error`]: Error responses for REST handlers

pub mod app;
pub mod error;
pub mod registry;
pub mod routes;
pub mod scheduler;
pub mod state;

// Re-exports for convenience
pub use app::{ServerConfig, create_app};
pub use error::AppError;
pub use registry::{BroadcastReport, ConnectionId, ConnectionRegistry};
pub use scheduler::{DEFAULT_TICK_INTERVAL, Scheduler, TickOutcome};
pub use state::{AccessTokens, Arena, ChannelTimeouts, ServerState, SharedArena};
