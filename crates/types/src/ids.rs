//! Identifier types for agents, players, and auctions.
//!
//! Agent and player ids are chosen by the connecting client and carried as
//! opaque strings. Auction ids are minted by the house from a monotonically
//! increasing counter and travel on the wire as `"a<N>"`.

use derive_more::{Display, From};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Wire prefix for auction identifiers.
pub const AUCTION_ID_PREFIX: char = 'a';

// =============================================================================
// Client-chosen identifiers
// =============================================================================

/// Stable identifier of a bidding agent, chosen by the agent at handshake.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of the human player owning one or more agents.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// =============================================================================
// AuctionId
// =============================================================================

/// Identifier of an auction, unique within one game.
///
/// Ordered numerically, so `a2 < a10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AuctionId(pub u64);

impl fmt::Display for AuctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", AUCTION_ID_PREFIX, self.0)
    }
}

/// Returned when a string is not of the form `a<N>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed auction id: {0:?}")]
pub struct ParseAuctionIdError(pub String);

impl FromStr for AuctionId {
    type Err = ParseAuctionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(AUCTION_ID_PREFIX)
            .filter(|digits| is_canonical_number(digits))
            .and_then(|digits| digits.parse().ok())
            .map(AuctionId)
            .ok_or_else(|| ParseAuctionIdError(s.to_owned()))
    }
}

/// Decimal digits with no sign and no leading zero, so each id has one spelling.
fn is_canonical_number(digits: &str) -> bool {
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

impl Serialize for AuctionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AuctionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_auction_id_display_and_parse() {
        let id = AuctionId(42);
        assert_eq!(id.to_string(), "a42");
        assert_eq!("a42".parse::<AuctionId>().unwrap(), id);
        assert_eq!("a10".parse::<AuctionId>().unwrap(), AuctionId(10));
        assert_eq!("a0".parse::<AuctionId>().unwrap(), AuctionId(0));
    }

    #[test]
    fn test_auction_id_rejects_malformed() {
        for raw in ["", "a", "42", "b42", "a-1", "a+1", "a4x", "a 4", "a03", "a00", "a007"] {
            assert!(raw.parse::<AuctionId>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_auction_id_numeric_order() {
        let mut ids = vec![AuctionId(10), AuctionId(2), AuctionId(1)];
        ids.sort();
        assert_eq!(ids, vec![AuctionId(1), AuctionId(2), AuctionId(10)]);
    }

    #[test]
    fn test_auction_id_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(AuctionId(3), 7u32);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a3":7}"#);

        let back: BTreeMap<AuctionId, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[&AuctionId(3)], 7);
    }

    #[test]
    fn test_agent_id_is_transparent() {
        let id = AgentId::from("agent-007");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""agent-007""#);
        assert_eq!(id.to_string(), "agent-007");
    }
}
