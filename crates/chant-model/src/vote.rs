//! Votes.

use serde::{Deserialize, Serialize};

use crate::{CellId, IdeaId, ParticipantId};

/// One ballot cast inside a cell.
///
/// Append-only. The `(cell, voter)` pair must never repeat; the store
/// enforces this atomically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vote {
    /// The cell voted in
    pub cell: CellId,

    /// Who voted
    pub voter: ParticipantId,

    /// The chosen idea
    pub idea: IdeaId,

    /// Logical sequence number within the deliberation (not wall-clock)
    pub cast_at: u64,
}
