//! Audit sinks: observers of agent registrations and round snapshots.
//!
//! The house calls the sink synchronously while it holds its own state, so a
//! sink must not block for long and must never fail the game. Errors are the
//! sink's problem to log.

use parking_lot::Mutex;
use types::{AgentIdentity, RoundState};

/// Receives an append-only stream of audit records.
pub trait AuditSink: Send + Sync {
    /// Sink name for logging.
    fn name(&self) -> &str;

    /// An agent id was seen for the first time in this game.
    fn record_agent(&self, identity: &AgentIdentity);

    /// A round was generated.
    fn record_round(&self, round: &RoundState);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn name(&self) -> &str {
        "NullAudit"
    }

    fn record_agent(&self, _identity: &AgentIdentity) {}

    fn record_round(&self, _round: &RoundState) {}
}

/// Keeps every record in memory. Useful in tests and for replaying a game.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    agents: Mutex<Vec<AgentIdentity>>,
    rounds: Mutex<Vec<RoundState>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agents(&self) -> Vec<AgentIdentity> {
        self.agents.lock().clone()
    }

    pub fn rounds(&self) -> Vec<RoundState> {
        self.rounds.lock().clone()
    }
}

impl AuditSink for MemoryAudit {
    fn name(&self) -> &str {
        "MemoryAudit"
    }

    fn record_agent(&self, identity: &AgentIdentity) {
        self.agents.lock().push(identity.clone());
    }

    fn record_round(&self, round: &RoundState) {
        self.rounds.lock().push(round.clone());
    }
}
