//! Chant Tier Planning
//!
//! Deterministic planning math for tiered small-group deliberation:
//! how many voting cells a tier needs, how large each cell is, and
//! which participants and ideas land in which cell.
//!
//! # Cell Sizes
//!
//! Every cell holds 3 to 7 people, preferring 5. Groups of 1 or 2 are
//! never emitted - they are too small for genuine deliberation - and
//! groups of 8+ lose intimacy. The policy is exact, not approximate:
//! the same participant count always produces the same size list.
//!
//! # Tier Shapes
//!
//! Idea distribution depends on how the pool compares to the cell count:
//!
//! - **Unique**: pool large enough that every cell receives its own
//!   non-overlapping slice (tier 1, typically).
//! - **Batched**: pool too small for unique slices - cells are grouped
//!   into batches and every cell in a batch judges the identical set.
//! - **Showdown**: five or fewer ideas remain - a single batch, every
//!   cell votes on the full final set.
//!
//! # Logarithmic Scaling
//!
//! With cells of ~5, each delegation tier shrinks the electorate by
//! ~5x: one million participants converge in 9 tiers, eight billion
//! in 14. Everything in this crate is a pure function of its inputs.

mod allocate;
mod sizes;

pub use allocate::{
    allocate_tier, partition_ideas, AllocationError, CellBlueprint, TierPlan, TierShape,
    IDEAS_PER_CELL_MIN, MAX_BATCH_IDEAS,
};
pub use sizes::{
    can_form_cells, cells_for, is_valid_cell_size, plan_cell_sizes, MAX_CELL_SIZE, MIN_CELL_SIZE,
    TARGET_CELL_SIZE,
};

/// Number of delegation tiers needed to reduce `n` participants to a
/// single cell, assuming target-size cells.
///
/// Rough guide only - actual tier count depends on idea survival.
pub fn estimated_tiers(n: u64) -> u32 {
    let mut remaining = n;
    let mut tiers = 0;
    while remaining > MAX_CELL_SIZE as u64 {
        remaining = remaining.div_ceil(TARGET_CELL_SIZE as u64);
        tiers += 1;
    }
    if remaining > 1 {
        tiers += 1;
    }
    tiers
}
