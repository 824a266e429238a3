use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::merge::AnchorResolution;
use crate::spreadsheet::merge::MergeIndex;
use crate::spreadsheet::merge::MergeRange;
use std::collections::HashMap;

/// A fetched window of one sheet: ragged rows of cells anchored at an absolute origin,
/// plus the merged regions of the whole sheet.
#[derive(Clone, Debug, Default)]
pub(crate) struct Sheet {
    /// Sheet title
    pub(crate) name: String,
    /// Absolute row index (0-based) of `rows[0]`
    pub(crate) row_offset: usize,
    /// Absolute column index (0-based) of `rows[_][0]`
    pub(crate) col_offset: usize,
    /// Cells by row; rows may differ in length
    pub(crate) rows: Vec<Vec<CellValue>>,
    /// Merged regions of the sheet, in absolute 0-based coordinates
    pub(crate) merges: Vec<MergeRange>,
    /// Cells outside the window, fetched separately, keyed by 1-based (row, col)
    detached: HashMap<(usize, usize), CellValue>,
}

impl Sheet {
    pub(crate) fn new(name: &str, row_offset: usize, col_offset: usize, rows: Vec<Vec<CellValue>>, merges: Vec<MergeRange>) -> Self {
        Self {
            name: name.to_owned(),
            row_offset,
            col_offset,
            rows,
            merges,
            detached: HashMap::new(),
        }
    }

    /// Returns true if the window holds no rows.
    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 1-based number of the first row in the window.
    pub(crate) fn first_row(&self) -> usize {
        self.row_offset + 1
    }

    /// 1-based number of the first column in the window.
    pub(crate) fn first_col(&self) -> usize {
        self.col_offset + 1
    }

    /// Length of the widest row in the window.
    pub(crate) fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub(crate) fn merge_index(&self) -> MergeIndex {
        MergeIndex::new(&self.merges)
    }

    /// Returns the cell at a 1-based (row, col), looking at the window first and then at
    /// separately attached cells.
    pub(crate) fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.cell(row, col).or_else(|| self.detached.get(&(row, col)))
    }

    /// Returns the cell at a 1-based (row, col) only if the window itself holds it.
    pub(crate) fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        let row = row.checked_sub(self.first_row())?;
        let col = col.checked_sub(self.first_col())?;
        self.rows.get(row)?.get(col)
    }

    /// Attaches a cell that lives outside the window (typically a merge anchor).
    pub(crate) fn attach(&mut self, row: usize, col: usize, cell: CellValue) {
        self.detached.insert((row, col), cell);
    }

    /// Lists the anchors (1-based) of followers in this window whose anchor cell is neither
    /// in the window nor attached. Sorted, without duplicates.
    pub(crate) fn missing_anchors(&self, merges: &MergeIndex) -> Vec<(usize, usize)> {
        if merges.is_empty() {
            return Vec::new();
        }
        let mut anchors = Vec::new();
        for (row_index, cells) in self.rows.iter().enumerate() {
            let row = self.first_row() + row_index;
            for col_index in 0..cells.len() {
                let col = self.first_col() + col_index;
                if let AnchorResolution::Follower { row, col } = merges.resolve(row, col) {
                    if self.get(row, col).is_none() {
                        anchors.push((row, col));
                    }
                }
            }
        }
        anchors.sort_unstable();
        anchors.dedup();
        anchors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|value| CellValue::text(value)).collect()
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("Sheet1", 0, 0, Vec::new(), Vec::new());
        assert!(sheet.is_empty());
        assert_eq!(sheet.width(), 0);
        assert_eq!(sheet.get(1, 1), None);
    }

    #[test]
    fn sheet_window_lookup() {
        let sheet = Sheet::new("Sheet1", 4, 1, vec![row(&["a", "b"]), row(&["c"])], Vec::new());
        assert_eq!(sheet.first_row(), 5);
        assert_eq!(sheet.first_col(), 2);
        assert_eq!(sheet.width(), 2);
        assert_eq!(sheet.get(5, 2).map(CellValue::value), Some("a"));
        assert_eq!(sheet.get(5, 3).map(CellValue::value), Some("b"));
        assert_eq!(sheet.get(6, 2).map(CellValue::value), Some("c"));
        assert_eq!(sheet.get(6, 3), None);
        assert_eq!(sheet.get(4, 2), None);
        assert_eq!(sheet.get(5, 1), None);
        assert_eq!(sheet.cell(6, 3), None);
        assert_eq!(sheet.cell(7, 2), None);
    }

    #[test]
    fn sheet_missing_anchors() {
        // B1:B4 merged vertically, window is row 3 only
        let merges = vec![MergeRange::new(0, 4, 1, 2)];
        let mut sheet = Sheet::new("Sheet1", 2, 0, vec![row(&["x", "", "z"])], merges);
        let index = sheet.merge_index();
        assert_eq!(sheet.missing_anchors(&index), vec![(1, 2)]);

        sheet.attach(1, 2, CellValue::text("anchor"));
        assert!(sheet.missing_anchors(&index).is_empty());
        assert_eq!(sheet.get(1, 2).map(CellValue::value), Some("anchor"));
        assert_eq!(sheet.cell(1, 2), None);
    }
}
