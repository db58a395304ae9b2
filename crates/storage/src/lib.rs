//! Storage: persistence for the auction gym.
//!
//! The only persistent state is an append-only audit trail of agent
//! registrations and round snapshots, written as JSON lines.

mod audit_log;
mod error;

pub use audit_log::{JsonlAuditLog, identity_log_path, round_log_path};
pub use error::{AuditError, Result};
