//! Reasons a bid is turned away.
//!
//! Rejections are never reported to the bidder; the house only traces them.

use types::{AgentId, AuctionId};

/// Why [`crate::AuctionHouse::accept_bid`] refused a bid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BidRejection {
    /// The auction is not open in the current round.
    #[error("auction {0} is not open this round")]
    UnknownAuction(AuctionId),

    /// Bids must be at least one gold.
    #[error("bid of {0} gold is below the minimum of 1")]
    NonPositive(i64),

    /// The bidder never completed a handshake in this game.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// The bidder cannot cover the bid.
    #[error("bid of {bid} gold exceeds balance of {balance}")]
    InsufficientGold { bid: u64, balance: u64 },
}
