//! Tier allocation: distribute a roster and an idea pool across planned
//! cells.
//!
//! Members are assigned by slicing the roster in order into chunks
//! matching the planned sizes - no cross-cell overlap. Idea assignment
//! depends on the tier shape:
//!
//! - [`TierShape::Unique`]: each cell receives a distinct balanced
//!   slice of the pool (`floor(ideas / cells)` each, first
//!   `ideas % cells` cells get one extra).
//! - [`TierShape::Batched`]: ideas are partitioned into batches of at
//!   most [`MAX_BATCH_IDEAS`], cells are divided across the batches as
//!   evenly as possible, and every cell in a batch judges the identical
//!   set. The same set being judged by multiple independent cells is
//!   what makes small-pool tiers robust.
//! - [`TierShape::Showdown`]: five or fewer ideas remain - one batch,
//!   every cell votes on the full final set.
//!
//! Invariant: the union of assigned idea sets, deduplicated, equals the
//! input pool. No idea is silently dropped or duplicated across
//! non-overlapping cells.

use thiserror::Error;

/// A tier is "unique" when every cell can receive at least this many
/// distinct ideas.
pub const IDEAS_PER_CELL_MIN: usize = 2;

/// Largest idea set a batch normally carries. Also the showdown bound.
pub const MAX_BATCH_IDEAS: usize = 5;

/// How ideas were distributed across a tier's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TierShape {
    /// Every cell has its own non-overlapping idea slice.
    Unique,
    /// Cells share batched idea sets.
    Batched,
    /// Terminal tier: one batch, the full remaining set everywhere.
    Showdown,
}

/// Errors from tier allocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The roster cannot form a single valid cell.
    #[error("roster of {0} cannot form any valid cell (minimum 3)")]
    RosterTooSmall(usize),

    /// The size plan does not cover the roster exactly.
    #[error("size plan sums to {plan_total} but roster has {roster} members")]
    PlanMismatch { plan_total: usize, roster: usize },

    /// Nothing to vote on.
    #[error("idea pool is empty")]
    EmptyIdeaPool,
}

/// One planned cell: who sits in it and what it votes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBlueprint<M, I> {
    /// Batch number within the tier. Cells sharing a batch share an
    /// idea set.
    pub batch: u32,
    /// Ordered members, fixed at creation.
    pub members: Vec<M>,
    /// Ideas this cell votes on.
    pub ideas: Vec<I>,
}

/// A fully allocated tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPlan<M, I> {
    /// How ideas were distributed.
    pub shape: TierShape,
    /// The planned cells, in roster order.
    pub cells: Vec<CellBlueprint<M, I>>,
}

impl<M, I> TierPlan<M, I> {
    /// Number of cells in the tier.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the tier has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of batches in the tier.
    pub fn batch_count(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.batch)
            .max()
            .map_or(0, |max| max as usize + 1)
    }
}

/// Partition `ideas` into `batches` balanced contiguous chunks.
///
/// Chunk sizes differ by at most one; earlier chunks take the extras.
pub fn partition_ideas<I: Clone>(ideas: &[I], batches: usize) -> Vec<Vec<I>> {
    if batches == 0 || ideas.is_empty() {
        return Vec::new();
    }
    let base = ideas.len() / batches;
    let extra = ideas.len() % batches;

    let mut chunks = Vec::with_capacity(batches);
    let mut start = 0;
    for b in 0..batches {
        let take = base + usize::from(b < extra);
        chunks.push(ideas[start..start + take].to_vec());
        start += take;
    }
    chunks
}

/// Allocate a roster and an idea pool across the planned cell sizes.
///
/// `plan` must come from [`plan_cell_sizes`](crate::plan_cell_sizes)
/// for the same roster length; the mismatch checks exist to catch
/// caller bugs, not to repair them.
pub fn allocate_tier<M: Clone, I: Clone>(
    roster: &[M],
    ideas: &[I],
    plan: &[usize],
) -> Result<TierPlan<M, I>, AllocationError> {
    if plan.is_empty() {
        return Err(AllocationError::RosterTooSmall(roster.len()));
    }
    let plan_total: usize = plan.iter().sum();
    if plan_total != roster.len() {
        return Err(AllocationError::PlanMismatch {
            plan_total,
            roster: roster.len(),
        });
    }
    if ideas.is_empty() {
        return Err(AllocationError::EmptyIdeaPool);
    }

    let num_cells = plan.len();

    // Slice the roster in order into chunks matching the plan.
    let mut member_chunks = Vec::with_capacity(num_cells);
    let mut start = 0;
    for &size in plan {
        member_chunks.push(roster[start..start + size].to_vec());
        start += size;
    }

    let shape = if ideas.len() <= MAX_BATCH_IDEAS {
        TierShape::Showdown
    } else if ideas.len() >= num_cells * IDEAS_PER_CELL_MIN {
        TierShape::Unique
    } else {
        TierShape::Batched
    };

    let cells = match shape {
        TierShape::Showdown => member_chunks
            .into_iter()
            .map(|members| CellBlueprint {
                batch: 0,
                members,
                ideas: ideas.to_vec(),
            })
            .collect(),
        TierShape::Unique => {
            let slices = partition_ideas(ideas, num_cells);
            member_chunks
                .into_iter()
                .zip(slices)
                .enumerate()
                .map(|(i, (members, ideas))| CellBlueprint {
                    batch: i as u32,
                    members,
                    ideas,
                })
                .collect()
        }
        TierShape::Batched => {
            // Batches of at most MAX_BATCH_IDEAS, clamped so no batch is
            // left without a cell (oversized batches beat dropped ideas).
            let batches = ideas.len().div_ceil(MAX_BATCH_IDEAS).min(num_cells).max(1);
            let idea_sets = partition_ideas(ideas, batches);

            let base = num_cells / batches;
            let extra = num_cells % batches;

            let mut cells = Vec::with_capacity(num_cells);
            let mut chunk_iter = member_chunks.into_iter();
            for (b, idea_set) in idea_sets.iter().enumerate() {
                let cells_in_batch = base + usize::from(b < extra);
                for _ in 0..cells_in_batch {
                    let members = chunk_iter
                        .next()
                        .expect("cell group division covers every cell");
                    cells.push(CellBlueprint {
                        batch: b as u32,
                        members,
                        ideas: idea_set.clone(),
                    });
                }
            }
            cells
        }
    };

    Ok(TierPlan { shape, cells })
}
