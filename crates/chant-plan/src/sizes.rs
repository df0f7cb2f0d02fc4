//! Cell-size planning: split `n` people into groups of 3-7, preferring 5.
//!
//! The policy is exact:
//! - n < 3 -> no valid plan (empty list; the caller must block tier
//!   formation)
//! - n == 3 -> [3], n == 4 -> [4]
//! - otherwise k = n / 5, r = n % 5:
//!   - r == 0        -> k cells of 5
//!   - r == 1 or 2   -> (k - 1) cells of 5, one cell of r + 5 (6 or 7)
//!   - r == 3 or 4   -> k cells of 5, one cell of r
//!
//! Folding the 1/2 remainder into a freed 5 is what guarantees no cell
//! of size 1, 2, or 8+ is ever emitted.

/// Smallest cell capable of genuine deliberation.
pub const MIN_CELL_SIZE: usize = 3;

/// Preferred cell size.
pub const TARGET_CELL_SIZE: usize = 5;

/// Largest cell that stays intimate.
pub const MAX_CELL_SIZE: usize = 7;

/// Whether `size` is an acceptable cell size.
pub const fn is_valid_cell_size(size: usize) -> bool {
    size >= MIN_CELL_SIZE && size <= MAX_CELL_SIZE
}

/// Whether `n` people can form at least one valid cell.
pub const fn can_form_cells(n: usize) -> bool {
    n >= MIN_CELL_SIZE
}

/// Number of cells `plan_cell_sizes(n)` will produce, without
/// materializing the plan.
pub const fn cells_for(n: usize) -> usize {
    if n < MIN_CELL_SIZE {
        return 0;
    }
    if n <= MAX_CELL_SIZE {
        return 1;
    }
    let k = n / TARGET_CELL_SIZE;
    match n % TARGET_CELL_SIZE {
        0 => k,
        // remainder folds into one oversized tail cell
        1 | 2 => k,
        // remainder stands as its own small tail cell
        _ => k + 1,
    }
}

/// Plan the cell sizes for `n` participants (or delegates).
///
/// Returns an ordered list of sizes, each in [3, 7], summing to `n`.
/// Empty for `n < 3`, which signals that no valid cell can form.
///
/// # Examples
///
/// ```
/// use chant_plan::plan_cell_sizes;
///
/// assert_eq!(plan_cell_sizes(16), vec![5, 5, 6]);
/// assert_eq!(plan_cell_sizes(17), vec![5, 5, 7]);
/// assert_eq!(plan_cell_sizes(18), vec![5, 5, 5, 3]);
/// assert_eq!(plan_cell_sizes(2), Vec::<usize>::new());
/// ```
pub fn plan_cell_sizes(n: usize) -> Vec<usize> {
    if n < MIN_CELL_SIZE {
        return Vec::new();
    }
    if n <= MAX_CELL_SIZE {
        // 3..=7 all fit in a single cell; 5 stays the target but 6 and 7
        // are also valid singletons.
        return vec![n];
    }

    let k = n / TARGET_CELL_SIZE;
    let r = n % TARGET_CELL_SIZE;

    let mut sizes;
    match r {
        0 => {
            sizes = vec![TARGET_CELL_SIZE; k];
        }
        1 | 2 => {
            // Fold one 5 into the remainder so the tail is 6 or 7,
            // never 1 or 2.
            sizes = vec![TARGET_CELL_SIZE; k - 1];
            sizes.push(TARGET_CELL_SIZE + r);
        }
        _ => {
            sizes = vec![TARGET_CELL_SIZE; k];
            sizes.push(r);
        }
    }
    sizes
}
