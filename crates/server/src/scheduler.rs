//! Round scheduler: the periodic tick that drives an active game.
//!
//! Each tick, while the game is active:
//!
//! 1. resolve the bids collected since the last tick
//! 2. generate the next round
//! 3. broadcast the round snapshot to every agent
//! 4. if the round limit is reached, mark the game done and disconnect everyone
//!
//! All four steps run under the arena lock. Broadcasting only queues
//! payloads, so a tick never waits on a peer.

use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use engine::GamePhase;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::state::SharedArena;

/// Default time between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No game is running.
    Idle,
    /// Round `round` was played and broadcast.
    Advanced { round: u64, recipients: usize },
    /// Round `round` was the last one; the game is done.
    Finished { round: u64, disconnected: usize },
}

/// Drives rounds for the shared arena at a fixed interval.
#[derive(Debug, Clone)]
pub struct Scheduler {
    arena: SharedArena,
    interval: Duration,
}

impl Scheduler {
    pub fn new(arena: SharedArena, interval: Duration) -> Self {
        Self { arena, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Play one round if the game is active.
    pub fn tick(&self) -> TickOutcome {
        let mut arena = self.arena.lock();
        if arena.house.phase() != GamePhase::Active {
            return TickOutcome::Idle;
        }

        arena.house.resolve_round();
        let state = arena.house.generate_round();

        let recipients = match serde_json::to_string(&state) {
            Ok(json) => {
                let report = arena.connections.broadcast(Utf8Bytes::from(json));
                debug!(
                    round = state.round,
                    delivered = report.delivered,
                    dropped = report.dropped,
                    removed = report.removed,
                    "round broadcast"
                );
                report.delivered
            }
            Err(e) => {
                warn!(round = state.round, error = %e, "failed to serialize round");
                0
            }
        };

        if arena.house.limit_reached() {
            arena.house.finish();
            let disconnected = arena.connections.disconnect_all();
            info!(
                rounds = arena.house.round(),
                agents = arena.house.agent_count(),
                disconnected,
                "game finished"
            );
            return TickOutcome::Finished {
                round: state.round,
                disconnected,
            };
        }

        TickOutcome::Advanced {
            round: state.round,
            recipients,
        }
    }

    /// Tick forever.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "round scheduler started");

        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{AuctionHouse, EconomyConfig};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use types::{AgentId, AgentIdentity, PlayerId, RoundState};

    use crate::state::Arena;

    fn arena_with_agents(n: usize) -> SharedArena {
        let mut house = AuctionHouse::new(EconomyConfig::default())
            .unwrap()
            .with_seed(11);
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
    fn test_idle_until_armed() {
        let arena = arena_with_agents(2);
        let scheduler = Scheduler::new(arena.clone(), DEFAULT_TICK_INTERVAL);

        assert_eq!(scheduler.tick(), TickOutcome::Idle);
        assert_eq!(arena.lock().house.round(), 0);
    }

    #[test]
    fn test_round_advances_by_one_per_tick() {
        let arena = arena_with_agents(2);
        {
            let mut arena = arena.lock();
            arena.house.set_round_limit(5);
            arena.house.arm();
        }
        let scheduler = Scheduler::new(arena.clone(), DEFAULT_TICK_INTERVAL);

        for expected in 0..4 {
            assert_eq!(
                scheduler.tick(),
                TickOutcome::Advanced {
                    round: expected,
                    recipients: 0
                }
            );
            assert_eq!(arena.lock().house.round(), expected + 1);
        }
        assert_eq!(
            scheduler.tick(),
            TickOutcome::Finished {
                round: 4,
                disconnected: 0
            }
        );
        assert_eq!(arena.lock().house.phase(), GamePhase::Done);

        // A finished game does not tick
        assert_eq!(scheduler.tick(), TickOutcome::Idle);
        assert_eq!(arena.lock().house.round(), 5);
    }

    #[tokio::test]
    async fn test_game_end_broadcasts_then_disconnects() {
        let arena = arena_with_agents(1);
        let (mut rx1, mut rx2) = {
            let mut arena = arena.lock();
            arena.house.set_round_limit(2);
            arena.house.arm();
            let (_, rx1) = arena.connections.add();
            let (_, rx2) = arena.connections.add();
            (rx1, rx2)
        };
        let scheduler = Scheduler::new(arena.clone(), DEFAULT_TICK_INTERVAL);

        assert_eq!(
            scheduler.tick(),
            TickOutcome::Advanced {
                round: 0,
                recipients: 2
            }
        );
        assert_eq!(
            scheduler.tick(),
            TickOutcome::Finished {
                round: 1,
                disconnected: 2
            }
        );
        assert!(arena.lock().connections.is_empty());

        for rx in [&mut rx1, &mut rx2] {
            let first = rx.recv().await.unwrap();
            let last = rx.recv().await.unwrap();
            let first: RoundState = serde_json::from_str(first.as_str()).unwrap();
            let last: RoundState = serde_json::from_str(last.as_str()).unwrap();
            assert_eq!(first.round, 0);
            assert_eq!(last.round, 1);
            assert_eq!(last.prev_auctions.len(), first.auctions.len());
            assert!(rx.recv().await.is_none());
        }
    }

    #[test]
    fn test_bids_between_ticks_are_resolved_next_tick() {
        let arena = arena_with_agents(1);
        {
            let mut arena = arena.lock();
            arena.house.set_round_limit(10);
            arena.house.arm();
        }
        let scheduler = Scheduler::new(arena.clone(), DEFAULT_TICK_INTERVAL);
        scheduler.tick();

        let agent = AgentId::from("agent0");
        let (auction, roll) = {
            let mut arena = arena.lock();
            let (auction, _) = arena.house.open_auctions().next().unwrap();
            let roll = arena.house.hidden_roll(&auction).unwrap();
            arena.house.accept_bid(&agent, &auction, 100).unwrap();
            (auction, roll)
        };

        scheduler.tick();
        let arena = arena.lock();
        assert_eq!(arena.house.agent(&agent).unwrap().points, roll);
        assert!(arena.house.hidden_roll(&auction).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_interval() {
        let arena = arena_with_agents(1);
        {
            let mut arena = arena.lock();
            arena.house.set_round_limit(3);
            arena.house.arm();
        }
        let handle = tokio::spawn(Scheduler::new(arena.clone(), Duration::from_millis(100)).run());

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(arena.lock().house.phase(), GamePhase::Done);
        assert_eq!(arena.lock().house.round(), 3);
        handle.abort();
    }
}
