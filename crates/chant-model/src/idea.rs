//! Ideas and their status lifecycle.

use serde::{Deserialize, Serialize};

use crate::{IdeaId, ParticipantId};

/// Where an idea currently stands in the deliberation.
///
/// Exactly one status is "active in voting" (`InVoting`) at any time.
/// Eliminated ideas are retained for audit, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdeaStatus {
    /// Submitted, waiting for a tier to form.
    Submitted,
    /// Assigned to at least one cell of the current tier.
    InVoting,
    /// Won its cell; advancing to the next tier.
    Advancing,
    /// Declared a cell or deliberation winner.
    Winner,
    /// Out of the running. Kept for audit.
    Eliminated,
    /// Reigning champion awaiting challengers (continuous flow).
    Defending,
}

impl std::fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::InVoting => write!(f, "in-voting"),
            Self::Advancing => write!(f, "advancing"),
            Self::Winner => write!(f, "winner"),
            Self::Eliminated => write!(f, "eliminated"),
            Self::Defending => write!(f, "defending"),
        }
    }
}

/// A submitted idea.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Idea {
    /// Unique identifier
    pub id: IdeaId,

    /// The participant who submitted it
    pub author: ParticipantId,

    /// Idea text
    pub text: String,

    /// The tier this idea is (or was last) voted on in
    pub tier: u32,

    /// Lifecycle status
    pub status: IdeaStatus,

    /// Cumulative tally score across all tiers, for audit and display
    pub score: u64,
}

impl Idea {
    /// Create a freshly submitted idea.
    pub fn new(id: IdeaId, author: ParticipantId, text: impl Into<String>) -> Self {
        Self {
            id,
            author,
            text: text.into(),
            tier: 0,
            status: IdeaStatus::Submitted,
            score: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_idea_starts_submitted() {
        let idea = Idea::new(IdeaId(1), ParticipantId(2), "plant trees");
        assert_eq!(idea.status, IdeaStatus::Submitted);
        assert_eq!(idea.tier, 0);
        assert_eq!(idea.score, 0);
    }

    #[test]
    fn status_display() {
        assert_eq!(format!("{}", IdeaStatus::InVoting), "in-voting");
        assert_eq!(format!("{}", IdeaStatus::Defending), "defending");
    }
}
