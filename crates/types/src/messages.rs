//! Wire messages exchanged over the agent and control channels.
//!
//! # Protocol
//!
//! ```text
//! Agent                                House
//!   │── AgentHandshake ──────────────────▶│  once, on connect
//!   │◀───────────────────── RoundState ───│  every tick while the game runs
//!   │── BidSubmission ───────────────────▶│  any time during a round
//!
//! Runner                               House
//!   │── ControlRequest ──────────────────▶│  once
//!   │◀──────────────── ControlResponse ───│  once, then the game starts
//! ```
//!
//! Every message is a JSON text frame. Maps are emitted in key order so the
//! same state always serializes to the same bytes.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::ids::{AgentId, AuctionId, PlayerId};

/// Minimum number of characters in an agent id.
pub const MIN_AGENT_ID_LEN: usize = 5;

/// Maximum number of characters in an agent display name.
pub const MAX_NAME_LEN: usize = 64;

// =============================================================================
// Agent handshake
// =============================================================================

/// First message an agent sends after connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHandshake {
    pub a_id: String,
    pub name: String,
    pub player_id: String,
}

/// Why a handshake was refused. Never sent to the peer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    #[error("agent id has {0} characters, need at least {min}", min = MIN_AGENT_ID_LEN)]
    AgentIdTooShort(usize),

    #[error("name has {0} characters, need 1..={max}", max = MAX_NAME_LEN)]
    NameLength(usize),

    #[error("player id is empty")]
    EmptyPlayerId,
}

impl AgentHandshake {
    /// Check the handshake shape and turn it into a typed identity.
    pub fn validate(self) -> Result<AgentIdentity, HandshakeError> {
        let id_len = self.a_id.chars().count();
        if id_len < MIN_AGENT_ID_LEN {
            return Err(HandshakeError::AgentIdTooShort(id_len));
        }

        let name_len = self.name.chars().count();
        if !(1..=MAX_NAME_LEN).contains(&name_len) {
            return Err(HandshakeError::NameLength(name_len));
        }

        if self.player_id.is_empty() {
            return Err(HandshakeError::EmptyPlayerId);
        }

        Ok(AgentIdentity {
            player_id: PlayerId(self.player_id),
            agent_id: AgentId(self.a_id),
            name: self.name,
        })
    }
}

/// A validated agent identity.
///
/// Also the record shape of the identity audit log:
/// `{"player_id": .., "agent_id": .., "name": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub player_id: PlayerId,
    pub agent_id: AgentId,
    pub name: String,
}

// =============================================================================
// Round broadcast
// =============================================================================

/// Public balance of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBalance {
    pub gold: u64,
    pub points: i64,
}

/// Public dice parameters of an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionParams {
    /// Faces per die.
    pub die: u32,
    /// Number of dice rolled.
    pub num: u32,
    /// Flat modifier added to the roll.
    pub bonus: i64,
}

impl AuctionParams {
    /// Smallest possible roll.
    pub fn min_roll(&self) -> i64 {
        i64::from(self.num) + self.bonus
    }

    /// Largest possible roll.
    pub fn max_roll(&self) -> i64 {
        i64::from(self.num) * i64::from(self.die) + self.bonus
    }
}

/// One bid as shown in the previous-round results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRecord {
    pub a_id: AgentId,
    pub gold: u64,
}

/// A closed auction with its revealed roll and all bids, highest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionOutcome {
    #[serde(flatten)]
    pub params: AuctionParams,
    pub reward: i64,
    pub bids: Vec<BidRecord>,
}

/// Snapshot broadcast to every agent at the start of a round.
///
/// The same record is appended to the round audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundState {
    pub round: u64,
    pub states: BTreeMap<AgentId, AgentBalance>,
    pub auctions: BTreeMap<AuctionId, AuctionParams>,
    pub prev_auctions: BTreeMap<AuctionId, AuctionOutcome>,
}

// =============================================================================
// Bid submission
// =============================================================================

/// Gold offered in a single bid entry.
///
/// Accepts JSON integers and floats; floats are truncated toward zero.
/// Out-of-range values saturate. Sign and size are checked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidAmount(pub i64);

impl<'de> Deserialize<'de> for BidAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl Visitor<'_> for AmountVisitor {
            type Value = BidAmount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a numeric gold amount")
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<BidAmount, E> {
                Ok(BidAmount(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<BidAmount, E> {
                Ok(BidAmount(i64::try_from(v).unwrap_or(i64::MAX)))
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<BidAmount, E> {
                if !v.is_finite() {
                    return Err(E::custom("gold amount must be finite"));
                }
                // `as` saturates at the i64 bounds
                Ok(BidAmount(v.trunc() as i64))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

impl Serialize for BidAmount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

/// A mapping of auction id to gold, in the order the agent wrote it.
///
/// Keys are kept raw: a key that is not a valid auction id is treated by the
/// house like a bid on an unknown auction and dropped. A repeated key keeps
/// its first position and its last amount, like any JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BidSubmission {
    entries: Vec<(String, BidAmount)>,
}

impl BidSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the amount for `auction`, appending it if new.
    pub fn bid(mut self, auction: impl Into<String>, gold: i64) -> Self {
        self.insert(auction.into(), BidAmount(gold));
        self
    }

    fn insert(&mut self, key: String, amount: BidAmount) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = amount,
            None => self.entries.push((key, amount)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(key, amount)| (key.as_str(), amount.0))
    }
}

impl<'de> Deserialize<'de> for BidSubmission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SubmissionVisitor;

        impl<'de> Visitor<'de> for SubmissionVisitor {
            type Value = BidSubmission;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of auction id to gold")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<BidSubmission, A::Error> {
                let mut submission = BidSubmission {
                    entries: Vec::with_capacity(map.size_hint().unwrap_or(0)),
                };
                while let Some((key, amount)) = map.next_entry::<String, BidAmount>()? {
                    submission.insert(key, amount);
                }
                Ok(submission)
            }
        }

        deserializer.deserialize_map(SubmissionVisitor)
    }
}

impl Serialize for BidSubmission {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, amount) in &self.entries {
            map.serialize_entry(key, amount)?;
        }
        map.end()
    }
}

// =============================================================================
// Control channel
// =============================================================================

/// One-shot request that configures and starts a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    pub num_rounds: u64,
}

/// Reply to a [`ControlRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    /// Token agents use to join.
    pub game_token: String,
    /// Agents registered at the moment the game was armed.
    pub num_players: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake(a_id: &str, name: &str, player_id: &str) -> AgentHandshake {
        AgentHandshake {
            a_id: a_id.into(),
            name: name.into(),
            player_id: player_id.into(),
        }
    }

    #[test]
    fn test_handshake_accepts_valid_identity() {
        let identity = handshake("agent1", "Max", "p1").validate().unwrap();
        assert_eq!(identity.agent_id, AgentId::from("agent1"));
        assert_eq!(identity.player_id, PlayerId::from("p1"));
        assert_eq!(identity.name, "Max");
    }

    #[test]
    fn test_handshake_rejections() {
        assert_eq!(
            handshake("abcd", "Max", "p1").validate(),
            Err(HandshakeError::AgentIdTooShort(4))
        );
        assert_eq!(
            handshake("agent1", "", "p1").validate(),
            Err(HandshakeError::NameLength(0))
        );
        assert_eq!(
            handshake("agent1", &"x".repeat(65), "p1").validate(),
            Err(HandshakeError::NameLength(65))
        );
        assert_eq!(
            handshake("agent1", "Max", "").validate(),
            Err(HandshakeError::EmptyPlayerId)
        );
    }

    #[test]
    fn test_handshake_counts_characters_not_bytes() {
        // 5 characters, 10 bytes
        assert!(handshake("äääää", "Max", "p1").validate().is_ok());
        assert!(handshake("agent1", &"ä".repeat(64), "p1").validate().is_ok());
    }

    #[test]
    fn test_bid_submission_keeps_order() {
        let json = r#"{"a9": 5, "a1": 3, "a5": 1}"#;
        let sub: BidSubmission = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = sub.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a9", "a1", "a5"]);
    }

    #[test]
    fn test_bid_submission_amounts() {
        let json = r#"{"a1": 12.9, "a2": -4, "a3": 0, "junk": 7}"#;
        let sub: BidSubmission = serde_json::from_str(json).unwrap();
        let bids: Vec<(&str, i64)> = sub.iter().collect();
        assert_eq!(bids, vec![("a1", 12), ("a2", -4), ("a3", 0), ("junk", 7)]);
    }

    #[test]
    fn test_bid_submission_duplicate_key_last_wins() {
        let json = r#"{"a3": 10, "a1": 5, "a3": 20}"#;
        let sub: BidSubmission = serde_json::from_str(json).unwrap();
        let bids: Vec<(&str, i64)> = sub.iter().collect();
        assert_eq!(bids, vec![("a3", 20), ("a1", 5)]);

        let built = BidSubmission::new()
            .bid("a3", 10)
            .bid("a1", 5)
            .bid("a3", 20);
        assert_eq!(built, sub);
    }

    #[test]
    fn test_bid_submission_rejects_non_numeric() {
        assert!(serde_json::from_str::<BidSubmission>(r#"{"a1": "lots"}"#).is_err());
        assert!(serde_json::from_str::<BidSubmission>(r#"[1, 2]"#).is_err());
    }

    #[test]
    fn test_round_state_wire_shape() {
        let mut states = BTreeMap::new();
        states.insert(
            AgentId::from("agent1"),
            AgentBalance {
                gold: 1000,
                points: 3,
            },
        );

        let params = AuctionParams {
            die: 6,
            num: 2,
            bonus: -1,
        };
        let mut auctions = BTreeMap::new();
        auctions.insert(AuctionId(2), params);

        let mut prev_auctions = BTreeMap::new();
        prev_auctions.insert(
            AuctionId(1),
            AuctionOutcome {
                params,
                reward: 7,
                bids: vec![BidRecord {
                    a_id: AgentId::from("agent1"),
                    gold: 40,
                }],
            },
        );

        let state = RoundState {
            round: 1,
            states,
            auctions,
            prev_auctions,
        };
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["round"], 1);
        assert_eq!(value["states"]["agent1"]["gold"], 1000);
        assert_eq!(value["auctions"]["a2"]["die"], 6);
        assert_eq!(value["prev_auctions"]["a1"]["bonus"], -1);
        assert_eq!(value["prev_auctions"]["a1"]["reward"], 7);
        assert_eq!(value["prev_auctions"]["a1"]["bids"][0]["a_id"], "agent1");
        assert!(value["auctions"]["a2"].get("reward").is_none());
    }

    #[test]
    fn test_auction_params_roll_bounds() {
        let params = AuctionParams {
            die: 8,
            num: 3,
            bonus: -10,
        };
        assert_eq!(params.min_roll(), -7);
        assert_eq!(params.max_roll(), 14);
    }

    #[test]
    fn test_control_messages() {
        let req: ControlRequest = serde_json::from_str(r#"{"num_rounds": 50}"#).unwrap();
        assert_eq!(req.num_rounds, 50);

        let resp = ControlResponse {
            game_token: "play123".into(),
            num_players: 4,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"game_token":"play123","num_players":4}"#);
    }
}
