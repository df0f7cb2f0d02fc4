//! Error types for chant-engine.
//!
//! Everything here is recoverable - rejected with no state change -
//! except [`Error::Invariant`], which indicates a planning or tally bug
//! rather than caller error. Invariant violations are logged loudly at
//! the point of detection and surfaced to the caller; the specific
//! operation is refused but the process carries on.

use chant_model::{CellId, IdeaId, ParticipantId, Phase};
use thiserror::Error;

/// Result type for chant-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during deliberation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The deliberation is not in the phase that permits this action.
    #[error("operation requires the {expected} phase, deliberation is in {actual}")]
    Phase { expected: Phase, actual: Phase },

    /// Unknown cell, idea, or participant.
    #[error("unknown {kind} {id}")]
    NotFound { kind: &'static str, id: u64 },

    /// The voter is not a member of the cell.
    #[error("participant {voter} is not a member of cell {cell}")]
    NotMember { cell: CellId, voter: ParticipantId },

    /// The `(cell, voter)` pair already has a vote.
    #[error("participant {voter} already voted in cell {cell}")]
    DuplicateVote { cell: CellId, voter: ParticipantId },

    /// The chosen idea is not on the cell's ballot.
    #[error("idea {idea} is not on cell {cell}'s ballot")]
    InvalidIdea { cell: CellId, idea: IdeaId },

    /// The cell has completed; no further votes are accepted.
    #[error("cell {0} has completed voting")]
    CellCompleted(CellId),

    /// Tier completion attempted while cells are still voting.
    #[error("tier {tier} has {pending} cell(s) still voting")]
    IncompleteTier { tier: u32, pending: usize },

    /// A challenge round needs at least one accumulated challenger.
    #[error("no challenger ideas have been submitted")]
    NoChallengers,

    /// Planning/allocation failure (roster too small, pool empty).
    #[error(transparent)]
    Allocation(#[from] chant_plan::AllocationError),

    /// Internal invariant violated - indicates an engine bug, not
    /// caller error. Fatal for the operation, logged loudly.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Construct a phase error.
    pub fn phase(expected: Phase, actual: Phase) -> Self {
        Self::Phase { expected, actual }
    }

    /// Whether the error is recoverable by the caller.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Invariant(_))
    }
}
