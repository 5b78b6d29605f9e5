/*
 * Cell Ranges Module
 *
 * Turns the cell-sorted assignment array into a per-cell lookup table: for
 * each cell, the half-open span [start, end) of sorted entries that belong to
 * it. Cells without fish hold the (-1, -1) sentinel.
 *
 * The table is reset before every build so spans left over from an earlier
 * frame (or an earlier fish count) never leak into the current one.
 */

use std::ops::Range;

use crate::spatial_grid::CellAssignment;

pub const EMPTY_CELL: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRange {
    pub start: i32,
    pub end: i32,
}

impl Default for CellRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl CellRange {
    pub const EMPTY: CellRange = CellRange {
        start: EMPTY_CELL,
        end: EMPTY_CELL,
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == EMPTY_CELL || self.end <= self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start) as usize
        }
    }

    // Span into the sorted array, None for an empty cell
    #[inline]
    pub fn as_range(&self) -> Option<Range<usize>> {
        if self.is_empty() {
            None
        } else {
            Some(self.start as usize..self.end as usize)
        }
    }
}

pub fn reset_ranges(ranges: &mut [CellRange]) {
    ranges.fill(CellRange::EMPTY);
}

/// Rebuild `ranges` from a cell-sorted assignment array.
///
/// Entry `i` opens its cell's span when it is the first entry or its cell
/// differs from entry `i - 1`, and closes it when it is the last entry or the
/// next entry's cell differs. Entries whose cell has no slot in `ranges` are
/// skipped, so an empty table (empty grid) is a no-op.
pub fn build_ranges(sorted: &[CellAssignment], ranges: &mut [CellRange]) {
    reset_ranges(ranges);

    let last = sorted.len().saturating_sub(1);
    for (i, entry) in sorted.iter().enumerate() {
        let Some(range) = ranges.get_mut(entry.cell_index as usize) else {
            continue;
        };

        if i == 0 || sorted[i - 1].cell_index != entry.cell_index {
            range.start = i as i32;
        }
        if i == last || sorted[i + 1].cell_index != entry.cell_index {
            range.end = i as i32 + 1;
        }
    }
}

// Entries of one cell, empty slice for an empty or unknown cell
#[inline]
pub fn cell_entries<'a>(
    sorted: &'a [CellAssignment],
    ranges: &[CellRange],
    cell: usize,
) -> &'a [CellAssignment] {
    ranges
        .get(cell)
        .and_then(CellRange::as_range)
        .and_then(|span| sorted.get(span))
        .unwrap_or(&[])
}

// Number of fish accounted for across every non-empty cell
pub fn occupied_len(ranges: &[CellRange]) -> usize {
    ranges.iter().map(CellRange::len).sum()
}
