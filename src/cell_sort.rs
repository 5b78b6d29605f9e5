/*
 * Cell Sort Module
 *
 * Orders the per-frame cell assignments by cell index so every cell's fish
 * form one contiguous run. This is the barrier of the frame: it needs the
 * complete output of cell assignment and must finish before the ranges are
 * built.
 *
 * Two strategies are available:
 * - Comparison: rayon's parallel unstable sort keyed on (cell, fish). The fish
 *   index in the key makes the result fully deterministic.
 * - Counting: histogram, exclusive prefix sum and scatter over the cell keys,
 *   i.e. a single-digit radix sort. Linear in fish + cells and stable.
 */

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::spatial_grid::CellAssignment;

// Below this many fish the sequential sort wins over spinning up rayon
const PARALLEL_SORT_THRESHOLD: usize = 4096;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortStrategy {
    #[default]
    Comparison,
    Counting,
}

/// Copy `assignments` into `sorted` and order it by ascending cell index.
///
/// `total_cells` is only consulted by the counting strategy; keys at or past
/// it (the degenerate cell of an empty grid) are folded into the last bucket.
pub fn sort_cells(
    assignments: &[CellAssignment],
    sorted: &mut Vec<CellAssignment>,
    total_cells: usize,
    strategy: SortStrategy,
) {
    match strategy {
        SortStrategy::Comparison => comparison_sort(assignments, sorted),
        SortStrategy::Counting => counting_sort(assignments, sorted, total_cells),
    }
}

fn comparison_sort(assignments: &[CellAssignment], sorted: &mut Vec<CellAssignment>) {
    sorted.clear();
    sorted.extend_from_slice(assignments);

    let key = |a: &CellAssignment| (a.cell_index, a.entity_index);
    if sorted.len() >= PARALLEL_SORT_THRESHOLD {
        sorted.par_sort_unstable_by_key(key);
    } else {
        sorted.sort_unstable_by_key(key);
    }
}

fn counting_sort(
    assignments: &[CellAssignment],
    sorted: &mut Vec<CellAssignment>,
    total_cells: usize,
) {
    sorted.clear();
    if assignments.is_empty() {
        return;
    }

    let buckets = total_cells.max(1);
    let bucket = |a: &CellAssignment| (a.cell_index as usize).min(buckets - 1);

    // Histogram
    let mut offsets = vec![0usize; buckets];
    for assignment in assignments {
        offsets[bucket(assignment)] += 1;
    }

    // Exclusive prefix sum
    let mut running = 0;
    for slot in offsets.iter_mut() {
        let count = *slot;
        *slot = running;
        running += count;
    }

    // Scatter
    sorted.resize(assignments.len(), CellAssignment::default());
    for assignment in assignments {
        let slot = &mut offsets[bucket(assignment)];
        sorted[*slot] = *assignment;
        *slot += 1;
    }
}

pub fn is_sorted_by_cell(sorted: &[CellAssignment]) -> bool {
    sorted.windows(2).all(|pair| pair[0].cell_index <= pair[1].cell_index)
}
