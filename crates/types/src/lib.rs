//! Shared types for the auction gym.
//!
//! - [`ids`]: agent, player, and auction identifiers
//! - [`messages`]: every JSON message that crosses a channel, validated at the boundary

pub mod ids;
pub mod messages;

pub use ids::{AUCTION_ID_PREFIX, AgentId, AuctionId, ParseAuctionIdError, PlayerId};
pub use messages::{
    AgentBalance, AgentHandshake, AgentIdentity, AuctionOutcome, AuctionParams, BidAmount,
    BidRecord, BidSubmission, ControlRequest, ControlResponse, HandshakeError, MAX_NAME_LEN,
    MIN_AGENT_ID_LEN, RoundState,
};
