//! Engine: the auction house for the auction gym.
//!
//! This crate owns all game state and none of the I/O:
//! - Agent records with gold and points
//! - Round generation from a weighted die table, with hidden rolls
//! - Bid escrow and resolution (highest bid wins the roll, losers get cashback)
//! - The game phase machine (inactive, active, done) and reset
//! - Audit hooks for registrations and round snapshots
//!
//! Callers that share a house between tasks must serialize access to it;
//! each method is one atomic step.

mod audit;
mod config;
mod error;
mod house;
mod standings;

pub use audit::{AuditSink, MemoryAudit, NullAudit};
pub use config::{
    BPS_SCALE, BasisPoints, ConfigError, DEFAULT_DIE_PROFILES, DEFAULT_ROUND_LIMIT, DieProfile,
    EconomyConfig,
};
pub use error::BidRejection;
pub use house::{Agent, AuctionHouse, GamePhase, RoundResolution};
pub use standings::{Grade, PASSING_POINTS, Standing};
