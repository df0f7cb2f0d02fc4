//! Per-tier audit records.

use serde::{Deserialize, Serialize};

use crate::IdeaId;

/// The outcome of one completed tier.
///
/// Recorded when the coordinator finalizes a tier; repeat completion
/// calls return the recorded result instead of re-running, which is
/// what makes tier completion idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierResult {
    /// The tier this result belongs to
    pub tier: u32,

    /// Distinct ideas advancing out of the tier, in id order
    pub advancing: Vec<IdeaId>,

    /// Per-idea score totals accumulated in this tier
    pub scores: Vec<(IdeaId, u64)>,

    /// Number of cells that voted in this tier
    pub cell_count: usize,
}

impl TierResult {
    /// Whether this tier produced a single consensus winner.
    pub fn is_consensus(&self) -> bool {
        self.advancing.len() == 1
    }

    /// The consensus winner, if any.
    pub fn winner(&self) -> Option<IdeaId> {
        if self.is_consensus() {
            self.advancing.first().copied()
        } else {
            None
        }
    }
}
