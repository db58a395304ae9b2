//! Final standings and letter grades.

use serde::{Deserialize, Serialize};
use types::AgentId;

/// Points an agent must exceed before it can earn a grade above F.
pub const PASSING_POINTS: i64 = 10;

/// Letter grade by relative rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    /// Grade for a rank in `(0, 1]`, where 1 is first place.
    pub fn from_rank(rank: f64, points: i64) -> Self {
        if points <= PASSING_POINTS {
            return Grade::F;
        }
        if rank > 0.89 {
            Grade::A
        } else if rank > 0.75 {
            Grade::B
        } else if rank > 0.60 {
            Grade::C
        } else if rank > 0.45 {
            Grade::D
        } else {
            Grade::E
        }
    }
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub agent_id: AgentId,
    pub name: String,
    pub points: i64,
    pub gold: u64,
    pub grade: Grade,
}

/// Rank `(agent_id, name, points, gold)` rows by points and grade them.
///
/// Ties keep the input order.
pub fn rank(mut rows: Vec<(AgentId, String, i64, u64)>) -> Vec<Standing> {
    rows.sort_by(|a, b| b.2.cmp(&a.2));
    let n = rows.len().max(1) as f64;

    rows.into_iter()
        .enumerate()
        .map(|(k, (agent_id, name, points, gold))| {
            let rank = (n - k as f64) / n;
            Standing {
                agent_id,
                name,
                points,
                gold,
                grade: Grade::from_rank(rank, points),
            }
        })
        .collect()
}
