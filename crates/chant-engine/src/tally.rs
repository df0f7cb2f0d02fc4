//! Weighted vote tallying.
//!
//! Per-idea score is the sum of voter weights (weight defaults to 1
//! for anyone not in the weight table). The winner is the idea with
//! the maximum score; on a tie the lowest [`IdeaId`] wins. The
//! tie-break is a deliberate, documented rule so outcomes are
//! reproducible under any vote arrival order.

use std::collections::{BTreeMap, HashMap};

use chant_model::{IdeaId, ParticipantId, Vote};
use tracing::error;

use crate::error::{Error, Result};

/// Outcome of tallying one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyResult {
    /// Winning idea.
    pub winner: IdeaId,
    /// The winner's score.
    pub score: u64,
    /// Per-idea totals, in id order.
    pub totals: Vec<(IdeaId, u64)>,
}

/// Accumulate per-idea weighted totals. Ideas nobody voted for do not
/// appear.
pub fn weighted_totals(
    votes: &[Vote],
    weights: &HashMap<ParticipantId, u64>,
) -> BTreeMap<IdeaId, u64> {
    let mut totals = BTreeMap::new();
    for vote in votes {
        let weight = weights.get(&vote.voter).copied().unwrap_or(1);
        *totals.entry(vote.idea).or_insert(0) += weight;
    }
    totals
}

/// Pick the winner from a totals map: maximum score, lowest id on a
/// tie. A strict-greater scan over the id-ordered map gives both.
pub fn select_winner(totals: &BTreeMap<IdeaId, u64>) -> Result<(IdeaId, u64)> {
    let mut best: Option<(IdeaId, u64)> = None;
    for (&idea, &score) in totals {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idea, score)),
        }
    }
    best.ok_or_else(|| {
        error!("tally produced zero candidates");
        Error::Invariant("tally produced zero candidates".into())
    })
}

/// Tally one cell's votes: totals plus winner.
pub fn tally_votes(votes: &[Vote], weights: &HashMap<ParticipantId, u64>) -> Result<TallyResult> {
    let totals = weighted_totals(votes, weights);
    let (winner, score) = select_winner(&totals)?;
    Ok(TallyResult {
        winner,
        score,
        totals: totals.into_iter().collect(),
    })
}
