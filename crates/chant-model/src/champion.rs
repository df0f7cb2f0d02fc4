//! Champion summary record.

use serde::{Deserialize, Serialize};

use crate::IdeaId;

/// Summary of a declared deliberation winner.
///
/// In continuous flow the champion is provisional - it defends against
/// accumulated challengers in later rounds, and `challenge_round`
/// records which round produced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Champion {
    /// The winning idea
    pub idea: IdeaId,

    /// Tiers it took to converge
    pub total_tiers: u32,

    /// Distinct voters who participated across the run
    pub total_voters: usize,

    /// Challenge round that produced this champion (0 for the first)
    pub challenge_round: u32,
}
