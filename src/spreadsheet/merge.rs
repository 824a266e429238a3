//! Merged-cell regions and anchor resolution.
//!
//! Storage is 0-based and half-open (as the data source reports it); every query
//! coordinate is 1-based.

use serde::Deserialize;
use serde::Serialize;

/// One merged region of a sheet, 0-based with exclusive end indexes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct MergeRange {
    pub(crate) start_row_index: usize,
    pub(crate) end_row_index: usize,
    pub(crate) start_column_index: usize,
    pub(crate) end_column_index: usize,
}

/// Shape of a merged region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum MergeKind {
    /// Several rows of a single column
    Vertical,
    /// Several columns of a single row
    Horizontal,
    /// Several rows and several columns
    Block,
}

/// Outcome of looking up a 1-based coordinate in a [`MergeIndex`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum AnchorResolution {
    /// The cell owns its own value (unmerged, or the anchor of a region).
    NotMerged,
    /// The cell follows the anchor at this 1-based (row, column).
    Follower { row: usize, col: usize },
}

impl MergeRange {
    pub(crate) fn new(start_row: usize, end_row: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start_row_index: start_row,
            end_row_index: end_row,
            start_column_index: start_col,
            end_column_index: end_col,
        }
    }

    fn row_span(&self) -> usize {
        self.end_row_index.saturating_sub(self.start_row_index)
    }

    fn col_span(&self) -> usize {
        self.end_column_index.saturating_sub(self.start_column_index)
    }

    pub(crate) fn kind(&self) -> MergeKind {
        match (self.row_span(), self.col_span()) {
            (rows, 1) if rows > 1 => MergeKind::Vertical,
            (1, cols) if cols > 1 => MergeKind::Horizontal,
            _ => MergeKind::Block,
        }
    }

    /// 1-based anchor (top-left) coordinate.
    pub(crate) fn anchor(&self) -> (usize, usize) {
        (self.start_row_index + 1, self.start_column_index + 1)
    }

    /// Returns true if the 1-based (row, col) is a non-anchor cell of this region.
    fn is_follower(&self, row: usize, col: usize) -> bool {
        let (anchor_row, anchor_col) = self.anchor();
        match self.kind() {
            MergeKind::Vertical => {
                col == anchor_col && row >= anchor_row + 1 && row <= self.end_row_index
            }
            MergeKind::Horizontal => {
                row == anchor_row && col >= anchor_col + 1 && col <= self.end_column_index
            }
            MergeKind::Block => {
                row >= anchor_row
                    && row <= self.end_row_index
                    && col >= anchor_col
                    && col <= self.end_column_index
                    && (row, col) != (anchor_row, anchor_col)
            }
        }
    }
}

/// Answers "which anchor owns this cell" for one sheet's merged regions.
#[derive(Clone, Debug, Default)]
pub(crate) struct MergeIndex {
    ranges: Vec<MergeRange>,
}

impl MergeIndex {
    pub(crate) fn new(ranges: &[MergeRange]) -> Self {
        Self {
            ranges: ranges
                .iter()
                .filter(|range| range.row_span() > 0 && range.col_span() > 0)
                .filter(|range| range.row_span() > 1 || range.col_span() > 1)
                .copied()
                .collect(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Resolves a 1-based coordinate. The first matching region wins; regions of one
    /// sheet never overlap, so at most one can match.
    pub(crate) fn resolve(&self, row: usize, col: usize) -> AnchorResolution {
        self.ranges
            .iter()
            .find(|range| range.is_follower(row, col))
            .map(|range| {
                let (row, col) = range.anchor();
                AnchorResolution::Follower { row, col }
            })
            .unwrap_or(AnchorResolution::NotMerged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_never_merges() {
        let index = MergeIndex::new(&[]);
        assert!(index.is_empty());
        for row in 1..10 {
            for col in 1..10 {
                assert_eq!(index.resolve(row, col), AnchorResolution::NotMerged);
            }
        }
    }

    #[test]
    fn vertical_merge() {
        let range = MergeRange::new(0, 3, 0, 1);
        assert_eq!(range.kind(), MergeKind::Vertical);
        let index = MergeIndex::new(&[range]);
        assert_eq!(index.resolve(1, 1), AnchorResolution::NotMerged);
        assert_eq!(index.resolve(2, 1), AnchorResolution::Follower { row: 1, col: 1 });
        assert_eq!(index.resolve(3, 1), AnchorResolution::Follower { row: 1, col: 1 });
        assert_eq!(index.resolve(4, 1), AnchorResolution::NotMerged);
        assert_eq!(index.resolve(2, 2), AnchorResolution::NotMerged);
    }

    #[test]
    fn horizontal_merge() {
        let range = MergeRange::new(4, 5, 1, 4);
        assert_eq!(range.kind(), MergeKind::Horizontal);
        let index = MergeIndex::new(&[range]);
        assert_eq!(index.resolve(5, 2), AnchorResolution::NotMerged);
        assert_eq!(index.resolve(5, 3), AnchorResolution::Follower { row: 5, col: 2 });
        assert_eq!(index.resolve(5, 4), AnchorResolution::Follower { row: 5, col: 2 });
        assert_eq!(index.resolve(5, 5), AnchorResolution::NotMerged);
        assert_eq!(index.resolve(6, 3), AnchorResolution::NotMerged);
    }

    #[test]
    fn block_merge() {
        let range = MergeRange::new(1, 3, 1, 3);
        assert_eq!(range.kind(), MergeKind::Block);
        let index = MergeIndex::new(&[range]);
        assert_eq!(index.resolve(2, 2), AnchorResolution::NotMerged);
        for (row, col) in [(2, 3), (3, 2), (3, 3)] {
            assert_eq!(index.resolve(row, col), AnchorResolution::Follower { row: 2, col: 2 });
        }
        assert_eq!(index.resolve(1, 1), AnchorResolution::NotMerged);
        assert_eq!(index.resolve(4, 4), AnchorResolution::NotMerged);
    }

    #[test]
    fn degenerate_ranges_are_ignored() {
        let index = MergeIndex::new(&[MergeRange::new(0, 1, 0, 1), MergeRange::new(2, 2, 0, 3)]);
        assert!(index.is_empty());
    }

    #[test]
    fn first_matching_range_wins() {
        let index = MergeIndex::new(&[MergeRange::new(0, 2, 0, 1), MergeRange::new(0, 1, 1, 3)]);
        assert_eq!(index.resolve(2, 1), AnchorResolution::Follower { row: 1, col: 1 });
        assert_eq!(index.resolve(1, 3), AnchorResolution::Follower { row: 1, col: 2 });
    }
}
