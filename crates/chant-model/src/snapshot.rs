//! Read-only display projections.
//!
//! A [`Snapshot`] is what a UI or reporting layer consumes: phase,
//! tier counters, the idea table, and every cell with its live tally.
//! Building one never mutates engine state.

use serde::{Deserialize, Serialize};

use crate::{CellId, CellStatus, IdeaId, IdeaStatus, ParticipantId};

/// Projection of one idea.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdeaView {
    pub id: IdeaId,
    pub author: ParticipantId,
    pub text: String,
    pub tier: u32,
    pub status: IdeaStatus,
    pub score: u64,
}

/// Projection of one cell with its live vote tally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellView {
    pub id: CellId,
    pub tier: u32,
    pub batch: u32,
    pub members: Vec<ParticipantId>,
    pub ideas: Vec<IdeaId>,
    pub votes_cast: usize,
    pub votes_needed: usize,
    pub status: CellStatus,
    pub winner: Option<IdeaId>,
    /// Live per-idea weighted tally, in id order
    pub tally: Vec<(IdeaId, u64)>,
}

/// Full read-only projection of a deliberation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: crate::Phase,
    pub current_tier: u32,
    pub challenge_round: u32,
    pub ideas: Vec<IdeaView>,
    pub cells: Vec<CellView>,
}
