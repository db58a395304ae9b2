//! The auction house: one game of sealed-bid dice auctions.
//!
//! # Round lifecycle
//!
//! ```text
//!            accept_bid (escrow)        resolve_round            generate_round
//! round N ─────────────────────────▶ pay winners/refunds ──▶ growth, new auctions,
//!   open                               (ledger frozen)        ledger cleared, N+1
//! ```
//!
//! # Game phases
//!
//! ```text
//! Inactive ──arm()──▶ Active ──finish()──▶ Done ──reset()──▶ Inactive
//! ```
//!
//! The house performs no I/O of its own. Every method is synchronous, so a
//! caller that serializes access (one lock) gets each call as an atomic step.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use types::{
    AgentBalance, AgentId, AgentIdentity, AuctionId, AuctionOutcome, AuctionParams, BidRecord,
    RoundState,
};

use crate::audit::{AuditSink, NullAudit};
use crate::config::{ConfigError, DEFAULT_ROUND_LIMIT, EconomyConfig};
use crate::error::BidRejection;
use crate::standings::{self, Standing};

/// Lifecycle phase of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Waiting for the control channel to start a game.
    Inactive,
    /// Rounds are being played.
    Active,
    /// The round limit was reached; the next connection resets the game.
    Done,
}

/// A registered agent and its balances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub identity: AgentIdentity,
    pub gold: u64,
    pub points: i64,
}

impl Agent {
    fn new(identity: AgentIdentity) -> Self {
        Self {
            identity,
            gold: 0,
            points: 0,
        }
    }

    pub fn balance(&self) -> AgentBalance {
        AgentBalance {
            gold: self.gold,
            points: self.points,
        }
    }
}

/// An auction open in the current round, with its hidden roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Auction {
    params: AuctionParams,
    roll: i64,
}

/// An escrowed bid.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bid {
    agent_id: AgentId,
    gold: u64,
}

/// What a call to [`AuctionHouse::resolve_round`] paid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundResolution {
    /// Auctions that received at least one bid.
    pub auctions_settled: usize,
    /// Bids that matched the winning amount.
    pub winning_bids: usize,
    /// Gold refunded to losing bids.
    pub gold_returned: u64,
}

/// One game of the auction gym.
pub struct AuctionHouse {
    economy: EconomyConfig,
    profile_index: WeightedIndex<u32>,
    rng: StdRng,
    audit: Arc<dyn AuditSink>,

    phase: GamePhase,
    round_limit: u64,
    /// Rounds generated so far; also the number of the next round.
    round: u64,
    next_auction: u64,

    agents: BTreeMap<AgentId, Agent>,
    current: BTreeMap<AuctionId, Auction>,
    ledger: BTreeMap<AuctionId, Vec<Bid>>,
    /// The ledger has been paid out and is closed to new bids.
    resolved: bool,
}

impl AuctionHouse {
    /// Create a house with an entropy-seeded RNG and no audit sink.
    pub fn new(economy: EconomyConfig) -> Result<Self, ConfigError> {
        economy.validate()?;
        let profile_index = WeightedIndex::new(economy.die_profiles.iter().map(|p| p.weight))
            .map_err(|_| ConfigError::NoWeight)?;

        Ok(Self {
            economy,
            profile_index,
            rng: StdRng::from_entropy(),
            audit: Arc::new(NullAudit),
            phase: GamePhase::Inactive,
            round_limit: DEFAULT_ROUND_LIMIT,
            round: 0,
            next_auction: 1,
            agents: BTreeMap::new(),
            current: BTreeMap::new(),
            ledger: BTreeMap::new(),
            resolved: false,
        })
    }

    /// Use a deterministic RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Send audit records to `audit`.
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read access
    // ─────────────────────────────────────────────────────────────────────────

    pub fn economy(&self) -> &EconomyConfig {
        &self.economy
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn round_limit(&self) -> u64 {
        self.round_limit
    }

    /// True once as many rounds have been generated as the limit allows.
    pub fn limit_reached(&self) -> bool {
        self.round >= self.round_limit
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent(&self, agent_id: &AgentId) -> Option<&Agent> {
        self.agents.get(agent_id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Public parameters of the auctions open this round.
    pub fn open_auctions(&self) -> impl Iterator<Item = (AuctionId, AuctionParams)> + '_ {
        self.current.iter().map(|(id, a)| (*id, a.params))
    }

    /// Hidden roll of an open auction. Server-side only; never put on the wire.
    pub fn hidden_roll(&self, auction_id: &AuctionId) -> Option<i64> {
        self.current.get(auction_id).map(|a| a.roll)
    }

    /// Gold currently escrowed in the ledger.
    pub fn escrowed_gold(&self) -> u64 {
        self.ledger.values().flatten().map(|b| b.gold).sum()
    }

    pub fn standings(&self) -> Vec<Standing> {
        standings::rank(
            self.agents
                .values()
                .map(|a| {
                    (
                        a.identity.agent_id.clone(),
                        a.identity.name.clone(),
                        a.points,
                        a.gold,
                    )
                })
                .collect(),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Phase control
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_round_limit(&mut self, rounds: u64) {
        self.round_limit = rounds;
    }

    /// Start playing rounds.
    pub fn arm(&mut self) {
        if self.phase == GamePhase::Active {
            debug!(limit = self.round_limit, "game re-armed while active");
        }
        self.phase = GamePhase::Active;
    }

    /// Stop playing; the game stays readable until reset.
    pub fn finish(&mut self) {
        self.phase = GamePhase::Done;
    }

    /// Clear every agent, auction, and bid. Economy, RNG, and audit sink stay.
    pub fn reset(&mut self) {
        self.phase = GamePhase::Inactive;
        self.round_limit = DEFAULT_ROUND_LIMIT;
        self.round = 0;
        self.next_auction = 1;
        self.agents.clear();
        self.current.clear();
        self.ledger.clear();
        self.resolved = false;
    }

    /// Reset if the previous game is over. Returns whether a reset happened.
    pub fn reset_if_done(&mut self) -> bool {
        if self.phase != GamePhase::Done {
            return false;
        }
        info!(rounds = self.round, agents = self.agents.len(), "starting a new game");
        self.reset();
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Game operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an agent with zero balances. Reconnecting with a known id
    /// keeps the existing record. Returns whether the agent is new.
    pub fn register_agent(&mut self, identity: AgentIdentity) -> bool {
        if let Some(existing) = self.agents.get(&identity.agent_id) {
            info!(
                agent = %existing.identity.agent_id,
                name = %existing.identity.name,
                "agent reconnected"
            );
            return false;
        }

        self.audit.record_agent(&identity);
        info!(
            agent = %identity.agent_id,
            name = %identity.name,
            player = %identity.player_id,
            "agent registered"
        );
        self.agents.insert(identity.agent_id.clone(), Agent::new(identity));
        true
    }

    /// Escrow a bid on an open auction.
    ///
    /// The agent's gold is deducted immediately; nothing is validated later.
    pub fn accept_bid(
        &mut self,
        agent_id: &AgentId,
        auction_id: &AuctionId,
        gold: i64,
    ) -> Result<(), BidRejection> {
        if self.resolved || !self.current.contains_key(auction_id) {
            return Err(BidRejection::UnknownAuction(*auction_id));
        }
        if gold < 1 {
            return Err(BidRejection::NonPositive(gold));
        }
        let gold = gold as u64;

        let agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| BidRejection::UnknownAgent(agent_id.clone()))?;
        if agent.gold < gold {
            return Err(BidRejection::InsufficientGold {
                bid: gold,
                balance: agent.gold,
            });
        }

        agent.gold -= gold;
        self.ledger.entry(*auction_id).or_default().push(Bid {
            agent_id: agent_id.clone(),
            gold,
        });
        Ok(())
    }

    /// Pay out the current ledger.
    ///
    /// Every bid equal to the highest bid on an auction earns its agent the
    /// full roll in points; ties are not split. Every other bid refunds the
    /// cashback share of its gold. Calling this twice in one round pays once.
    pub fn resolve_round(&mut self) -> RoundResolution {
        let mut summary = RoundResolution::default();
        if self.resolved {
            return summary;
        }
        self.resolved = true;

        for (auction_id, bids) in &self.ledger {
            let Some(win_amount) = bids.iter().map(|b| b.gold).max() else {
                continue;
            };
            let Some(auction) = self.current.get(auction_id) else {
                continue;
            };
            summary.auctions_settled += 1;

            for bid in bids {
                // Agents only disappear on reset, which also clears the ledger
                let Some(agent) = self.agents.get_mut(&bid.agent_id) else {
                    continue;
                };
                if bid.gold == win_amount {
                    agent.points += auction.roll;
                    summary.winning_bids += 1;
                } else {
                    let back = self.economy.cashback(bid.gold);
                    agent.gold = agent.gold.saturating_add(back);
                    summary.gold_returned += back;
                }
            }
        }

        debug!(
            round = self.round,
            settled = summary.auctions_settled,
            winners = summary.winning_bids,
            returned = summary.gold_returned,
            "round resolved"
        );
        summary
    }

    /// Open the next round and return its snapshot.
    ///
    /// Applies growth to every agent, posts fresh auctions, reveals the
    /// closing round's rolls and bids, clears the ledger, and advances the
    /// round counter. A ledger that was never resolved is resolved first so
    /// escrowed gold is never lost.
    pub fn generate_round(&mut self) -> RoundState {
        if !self.resolved {
            self.resolve_round();
        }

        for agent in self.agents.values_mut() {
            agent.gold = self.economy.grow(agent.gold);
        }

        let count = self.economy.auction_count(self.agents.len());
        let fresh: BTreeMap<AuctionId, Auction> = (0..count).map(|_| self.roll_auction()).collect();
        let closed = std::mem::replace(&mut self.current, fresh);
        let mut ledger = std::mem::take(&mut self.ledger);
        self.resolved = false;

        let prev_auctions = closed
            .into_iter()
            .map(|(id, auction)| {
                let mut bids = ledger.remove(&id).unwrap_or_default();
                // Stable: equal bids keep submission order
                bids.sort_by(|a, b| b.gold.cmp(&a.gold));
                let outcome = AuctionOutcome {
                    params: auction.params,
                    reward: auction.roll,
                    bids: bids
                        .into_iter()
                        .map(|b| BidRecord {
                            a_id: b.agent_id,
                            gold: b.gold,
                        })
                        .collect(),
                };
                (id, outcome)
            })
            .collect();

        let state = RoundState {
            round: self.round,
            states: self
                .agents
                .iter()
                .map(|(id, a)| (id.clone(), a.balance()))
                .collect(),
            auctions: self.open_auctions().collect(),
            prev_auctions,
        };

        self.round += 1;
        self.audit.record_round(&state);
        state
    }

    /// Draw one auction from the die table.
    fn roll_auction(&mut self) -> (AuctionId, Auction) {
        let profile = self.economy.die_profiles[self.profile_index.sample(&mut self.rng)];
        let num = self.rng.gen_range(1..=profile.max_dice);
        let bonus = self.rng.gen_range(profile.min_bonus..=profile.max_bonus);
        let dice: i64 = (0..num)
            .map(|_| i64::from(self.rng.gen_range(1..=profile.die)))
            .sum();

        let id = AuctionId(self.next_auction);
        self.next_auction += 1;

        let auction = Auction {
            params: AuctionParams {
                die: profile.die,
                num,
                bonus,
            },
            roll: dice + bonus,
        };
        (id, auction)
    }

    /// Open a hand-made auction in the current round.
    ///
    /// Lets tests and replays pin the hidden roll instead of sampling it.
    pub fn post_auction(&mut self, params: AuctionParams, roll: i64) -> AuctionId {
        let id = AuctionId(self.next_auction);
        self.next_auction += 1;
        self.current.insert(id, Auction { params, roll });
        id
    }
}

impl std::fmt::Debug for AuctionHouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionHouse")
            .field("phase", &self.phase)
            .field("round", &self.round)
            .field("round_limit", &self.round_limit)
            .field("agents", &self.agents.len())
            .field("open_auctions", &self.current.len())
            .field("audit", &self.audit.name())
            .finish()
    }
}
