//! Economy constants of the auction house.
//!
//! Ratios are fixed-point basis points so that every balance update is exact
//! integer arithmetic: `10_000` bps = 1.0.

use serde::{Deserialize, Serialize};

/// Basis points per 1.0.
pub const BPS_SCALE: u64 = 10_000;

/// Round limit a fresh game starts with.
pub const DEFAULT_ROUND_LIMIT: u64 = 10;

/// A non-negative ratio in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BasisPoints(pub u64);

impl BasisPoints {
    /// `floor(value * ratio)`.
    pub fn apply_floor(self, value: u64) -> u64 {
        let scaled = u128::from(value) * u128::from(self.0) / u128::from(BPS_SCALE);
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }

    /// `ceil(value * ratio)`.
    pub fn apply_ceil(self, value: u64) -> u64 {
        let scaled = (u128::from(value) * u128::from(self.0)).div_ceil(u128::from(BPS_SCALE));
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }

    pub fn to_float(self) -> f64 {
        self.0 as f64 / BPS_SCALE as f64
    }
}

/// One row of the weighted die table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieProfile {
    /// Faces per die.
    pub die: u32,
    /// Relative selection weight.
    pub weight: u32,
    /// Upper bound for the number of dice; the lower bound is 1.
    pub max_dice: u32,
    pub min_bonus: i64,
    pub max_bonus: i64,
}

impl DieProfile {
    const fn new(die: u32, weight: u32, max_dice: u32, min_bonus: i64, max_bonus: i64) -> Self {
        Self {
            die,
            weight,
            max_dice,
            min_bonus,
            max_bonus,
        }
    }
}

/// The die table used by every game.
pub const DEFAULT_DIE_PROFILES: [DieProfile; 9] = [
    DieProfile::new(2, 8, 5, -2, 10),
    DieProfile::new(3, 8, 7, -8, 2),
    DieProfile::new(4, 9, 10, -5, 16),
    DieProfile::new(6, 8, 2, -5, 8),
    DieProfile::new(8, 6, 3, -10, 21),
    DieProfile::new(10, 6, 3, -4, 2),
    DieProfile::new(12, 5, 6, -5, 5),
    DieProfile::new(20, 2, 2, -4, 7),
    DieProfile::new(20, 1, 4, -4, 3),
];

/// Rejected economy settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("die table is empty or has zero total weight")]
    NoWeight,

    #[error("die profile {index}: {reason}")]
    InvalidProfile { index: usize, reason: &'static str },
}

/// Economy constants. Fixed per process; only the round limit changes at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Gold every agent receives at the start of each round.
    pub gold_income: u64,
    /// Interest multiplier applied to stored gold before income.
    pub bank_interest: BasisPoints,
    /// Share of a losing bid refunded as gold.
    pub gold_back: BasisPoints,
    /// Auctions offered per registered agent, rounded up.
    pub auctions_per_agent: BasisPoints,
    /// Weighted die table.
    pub die_profiles: Vec<DieProfile>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            gold_income: 1000,
            bank_interest: BasisPoints(11_000),
            gold_back: BasisPoints(6_000),
            auctions_per_agent: BasisPoints(15_000),
            die_profiles: DEFAULT_DIE_PROFILES.to_vec(),
        }
    }
}

impl EconomyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gold_income(mut self, gold: u64) -> Self {
        self.gold_income = gold;
        self
    }

    pub fn bank_interest(mut self, ratio: BasisPoints) -> Self {
        self.bank_interest = ratio;
        self
    }

    pub fn gold_back(mut self, ratio: BasisPoints) -> Self {
        self.gold_back = ratio;
        self
    }

    pub fn auctions_per_agent(mut self, ratio: BasisPoints) -> Self {
        self.auctions_per_agent = ratio;
        self
    }

    pub fn die_profiles(mut self, profiles: Vec<DieProfile>) -> Self {
        self.die_profiles = profiles;
        self
    }

    /// Balance after one round of growth: `floor(gold * interest) + income`.
    pub fn grow(&self, gold: u64) -> u64 {
        self.bank_interest
            .apply_floor(gold)
            .saturating_add(self.gold_income)
    }

    /// Refund for a losing bid.
    pub fn cashback(&self, bid: u64) -> u64 {
        self.gold_back.apply_floor(bid)
    }

    /// Auctions to offer for the given number of agents.
    pub fn auction_count(&self, agents: usize) -> usize {
        let count = self.auctions_per_agent.apply_ceil(agents as u64);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Check the die table so that sampling can never fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, p) in self.die_profiles.iter().enumerate() {
            let reason = if p.die == 0 {
                "die has no faces"
            } else if p.max_dice == 0 {
                "max_dice must be at least 1"
            } else if p.min_bonus > p.max_bonus {
                "min_bonus exceeds max_bonus"
            } else {
                continue;
            };
            return Err(ConfigError::InvalidProfile { index, reason });
        }

        let total: u64 = self.die_profiles.iter().map(|p| u64::from(p.weight)).sum();
        if total == 0 {
            return Err(ConfigError::NoWeight);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_points_floor() {
        assert_eq!(BasisPoints(11_000).apply_floor(1000), 1100);
        assert_eq!(BasisPoints(11_000).apply_floor(9), 9); // 9.9
        assert_eq!(BasisPoints(6_000).apply_floor(500), 300);
        assert_eq!(BasisPoints(6_000).apply_floor(7), 4); // 4.2
        assert_eq!(BasisPoints(6_000).apply_floor(1), 0);
    }

    #[test]
    fn test_basis_points_ceil() {
        let ratio = BasisPoints(15_000);
        assert_eq!(ratio.apply_ceil(0), 0);
        assert_eq!(ratio.apply_ceil(1), 2);
        assert_eq!(ratio.apply_ceil(2), 3);
        assert_eq!(ratio.apply_ceil(3), 5);
    }

    #[test]
    fn test_grow() {
        let economy = EconomyConfig::default();
        assert_eq!(economy.grow(0), 1000);
        assert_eq!(economy.grow(500), 1550);
        assert_eq!(economy.grow(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_default_table_is_valid() {
        let economy = EconomyConfig::default();
        assert!(economy.validate().is_ok());
        assert_eq!(economy.die_profiles.len(), 9);
        let total: u32 = economy.die_profiles.iter().map(|p| p.weight).sum();
        assert_eq!(total, 53);
    }

    #[test]
    fn test_validate_rejects_bad_tables() {
        let empty = EconomyConfig::default().die_profiles(vec![]);
        assert_eq!(empty.validate(), Err(ConfigError::NoWeight));

        let inverted = EconomyConfig::default().die_profiles(vec![DieProfile::new(6, 1, 1, 3, -3)]);
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::InvalidProfile { index: 0, .. })
        ));

        let zero_dice = EconomyConfig::default().die_profiles(vec![DieProfile::new(6, 1, 0, 0, 0)]);
        assert!(zero_dice.validate().is_err());
    }
}
