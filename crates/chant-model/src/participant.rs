//! Participants and delegates.

use serde::{Deserialize, Serialize};

use crate::{IdeaId, ParticipantId};

/// A member of the deliberation roster.
///
/// Identity is immutable once created. `weight` defaults to 1 and only
/// exceeds 1 when the participant acts as a delegate in a later tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    /// Unique identifier
    pub id: ParticipantId,

    /// Human-readable name
    pub name: String,

    /// Number of people this vote counts for
    pub weight: u64,
}

impl Participant {
    /// Create a participant with the default weight of 1.
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            weight: 1,
        }
    }

    /// Create a participant with an explicit weight (delegate rosters).
    pub fn with_weight(id: ParticipantId, name: impl Into<String>, weight: u64) -> Self {
        Self {
            id,
            name: name.into(),
            weight,
        }
    }
}

/// A cell winner's author, promoted to represent that cell's
/// constituency in the next tier.
///
/// Created only at a tier boundary. The weight is the size of the
/// producing cell at tier 1, or the author's previously recorded
/// delegate weight afterwards - carried forward unchanged, never
/// re-derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delegate {
    /// The person acting as delegate
    pub id: ParticipantId,

    /// Name, copied from the underlying participant
    pub name: String,

    /// Constituents represented
    pub weight: u64,

    /// The winning idea(s) this delegate champions
    pub representing: Vec<IdeaId>,
}

impl Delegate {
    /// View this delegate as a roster participant for allocation.
    pub fn as_participant(&self) -> Participant {
        Participant::with_weight(self.id, self.name.clone(), self.weight)
    }
}
