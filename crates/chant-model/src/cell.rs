//! Voting cells.

use serde::{Deserialize, Serialize};

use crate::{CellId, IdeaId, ParticipantId};

/// Cell lifecycle. `Completed` is terminal: once there, no further
/// votes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellStatus {
    /// Accepting votes.
    Voting,
    /// All required votes are in; winner extracted.
    Completed,
}

impl std::fmt::Display for CellStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Voting => write!(f, "voting"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A small voting group formed for one tier.
///
/// Membership and idea assignment are fixed at creation; the only
/// mutations are vote accumulation (tracked elsewhere) and the
/// one-time transition to `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cell {
    /// Unique identifier
    pub id: CellId,

    /// Tier this cell belongs to
    pub tier: u32,

    /// Batch number within the tier; cells of a batch share an idea set
    pub batch: u32,

    /// Ordered members, size 3-7, fixed at creation
    pub members: Vec<ParticipantId>,

    /// Ideas assigned to this cell
    pub ideas: Vec<IdeaId>,

    /// Votes required to complete (== members.len() unless overridden)
    pub votes_needed: usize,

    /// Lifecycle status
    pub status: CellStatus,

    /// Winning idea, set exactly once at completion
    pub winner: Option<IdeaId>,
}

impl Cell {
    /// Create a cell in the `Voting` state requiring one vote per member.
    pub fn new(
        id: CellId,
        tier: u32,
        batch: u32,
        members: Vec<ParticipantId>,
        ideas: Vec<IdeaId>,
    ) -> Self {
        let votes_needed = members.len();
        Self {
            id,
            tier,
            batch,
            members,
            ideas,
            votes_needed,
            status: CellStatus::Voting,
            winner: None,
        }
    }

    /// Whether `participant` sits in this cell.
    pub fn has_member(&self, participant: ParticipantId) -> bool {
        self.members.contains(&participant)
    }

    /// Whether `idea` is on this cell's ballot.
    pub fn has_idea(&self, idea: IdeaId) -> bool {
        self.ideas.contains(&idea)
    }

    /// Whether the cell has finished voting.
    pub fn is_completed(&self) -> bool {
        self.status == CellStatus::Completed
    }
}
