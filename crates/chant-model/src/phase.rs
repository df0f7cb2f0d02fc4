//! Deliberation phase machine.

use serde::{Deserialize, Serialize};

/// The deliberation-level state machine.
///
/// ```text
/// Submission -> Voting -> Completed
///                  ^          |
///                  |          v        (continuous flow only)
///                  +---- Accumulating
/// ```
///
/// In continuous flow a consensus sends the deliberation to
/// `Accumulating`, where challenger ideas gather until the next round
/// of voting opens. Only an explicit close reaches `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Collecting ideas; no cells exist yet.
    Submission,
    /// Tier voting in progress.
    Voting,
    /// A champion reigns; challengers may be submitted.
    Accumulating,
    /// Deliberation finished. Terminal.
    Completed,
}

impl Phase {
    /// Whether votes may be cast.
    pub fn accepts_votes(&self) -> bool {
        matches!(self, Self::Voting)
    }

    /// Whether new ideas may be submitted.
    pub fn accepts_ideas(&self) -> bool {
        matches!(self, Self::Submission | Self::Accumulating)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submission => write!(f, "submission"),
            Self::Voting => write!(f, "voting"),
            Self::Accumulating => write!(f, "accumulating"),
            Self::Completed => write!(f, "completed"),
        }
    }
}
