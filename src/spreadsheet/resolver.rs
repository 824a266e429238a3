use crate::spreadsheet::cell::CellRecord;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::merge::AnchorResolution;
use crate::spreadsheet::merge::MergeIndex;
use crate::spreadsheet::sheet::Sheet;

/// Position of the next cell to visit in a window, as (row, column) offsets.
pub(crate) type CellCursor = (usize, usize);

/// Turns the cells of a sheet window into [`CellRecord`]s.
///
/// A merged follower reports its own address with the anchor's value, formula, note and
/// hyperlink. Cells without a value and without a formula produce no record.
pub(crate) struct CellAddressResolver<'a> {
    sheet: &'a Sheet,
    merges: &'a MergeIndex,
}

impl<'a> CellAddressResolver<'a> {
    pub(crate) fn new(sheet: &'a Sheet, merges: &'a MergeIndex) -> Self {
        Self { sheet, merges }
    }

    /// Cell whose data the 1-based (row, col) reports.
    fn owner(&self, row: usize, col: usize, cell: &'a CellValue) -> Option<&'a CellValue> {
        match self.merges.resolve(row, col) {
            AnchorResolution::Follower { row, col } => self.sheet.get(row, col),
            AnchorResolution::NotMerged => Some(cell),
        }
    }

    /// Record for the 1-based (row, col), or None if nothing is there to report.
    pub(crate) fn resolve(&self, row: usize, col: usize) -> Option<CellRecord> {
        let cell = self.sheet.cell(row, col)?;
        let owner = self.owner(row, col, cell)?;
        if owner.is_empty() && owner.formula().is_none() {
            return None;
        }
        Some(CellRecord::new(&self.sheet.name, row, col, owner))
    }

    /// Records of the window, row by row, left to right, starting at `cursor`, for resuming a stream across output chunks.
    pub(crate) fn records_from(&'a self, cursor: CellCursor) -> CellRecords<'a> {
        CellRecords {
            resolver: self,
            cursor,
        }
    }
}

/// Lazy stream of cell records over one window.
pub(crate) struct CellRecords<'a> {
    resolver: &'a CellAddressResolver<'a>,
    cursor: CellCursor,
}

impl CellRecords<'_> {
    /// Where the next call to `next` will start.
    pub(crate) fn cursor(&self) -> CellCursor {
        self.cursor
    }
}

impl Iterator for CellRecords<'_> {
    type Item = CellRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let sheet = self.resolver.sheet;
        loop {
            let (row_index, col_index) = self.cursor;
            let cells = sheet.rows.get(row_index)?;
            if col_index >= cells.len() {
                self.cursor = (row_index + 1, 0);
                continue;
            }
            self.cursor = (row_index, col_index + 1);
            let row = sheet.first_row() + row_index;
            let col = sheet.first_col() + col_index;
            if let Some(record) = self.resolver.resolve(row, col) {
                return Some(record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::EnteredValue;
    use crate::spreadsheet::merge::MergeRange;

    fn row(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|value| CellValue::text(value)).collect()
    }

    #[test]
    fn skips_empty_cells_but_keeps_formulas() {
        let formula = CellValue {
            user_entered_value: Some(EnteredValue {
                formula_value: Some("=\"\"".to_owned()),
            }),
            ..CellValue::default()
        };
        let sheet = Sheet::new("S", 0, 0, vec![row(&["a", ""]), vec![CellValue::default(), formula]], Vec::new());
        let merges = sheet.merge_index();
        let resolver = CellAddressResolver::new(&sheet, &merges);
        let addresses: Vec<_> = resolver.records_from((0, 0)).map(|record| record.cell_address).collect();
        assert_eq!(addresses, ["A1", "B2"]);
        let record = resolver.resolve(2, 2).unwrap();
        assert_eq!(record.value, "");
        assert_eq!(record.formula.as_deref(), Some("=\"\""));
        assert!(resolver.resolve(1, 2).is_none());
    }

    #[test]
    fn followers_report_anchor_data_at_own_address() {
        // B2:C3 block merge
        let anchor = CellValue {
            note: Some("spans four cells".to_owned()),
            ..CellValue::text("Block")
        };
        let sheet = Sheet::new(
            "S",
            0,
            0,
            vec![row(&["x"]), vec![CellValue::text("y"), anchor, CellValue::default()], row(&["z", "", ""])],
            vec![MergeRange::new(1, 3, 1, 3)],
        );
        let merges = sheet.merge_index();
        let resolver = CellAddressResolver::new(&sheet, &merges);
        let records: Vec<_> = resolver.records_from((0, 0)).collect();
        let addresses: Vec<_> = records.iter().map(|record| record.cell_address.as_str()).collect();
        assert_eq!(addresses, ["A1", "A2", "B2", "C2", "A3", "B3", "C3"]);
        let follower = &records[6];
        assert_eq!(follower.column_letter, "C");
        assert_eq!(follower.row_number, 3);
        assert_eq!(follower.value, "Block");
        assert_eq!(follower.note.as_deref(), Some("spans four cells"));
    }

    #[test]
    fn offset_window_uses_absolute_addresses() {
        let sheet = Sheet::new("Data", 9, 2, vec![row(&["v"])], Vec::new());
        let merges = sheet.merge_index();
        let resolver = CellAddressResolver::new(&sheet, &merges);
        let record = resolver.resolve(10, 3).unwrap();
        assert_eq!(record.cell_address, "C10");
        assert_eq!(record.sheet_name, "Data");
        assert!(resolver.resolve(1, 1).is_none());
    }

    #[test]
    fn resumes_from_cursor() {
        let sheet = Sheet::new("S", 0, 0, vec![row(&["a", "b"]), row(&["c"])], Vec::new());
        let merges = sheet.merge_index();
        let resolver = CellAddressResolver::new(&sheet, &merges);
        let mut stream = resolver.records_from((0, 0));
        assert_eq!(stream.next().unwrap().cell_address, "A1");
        let cursor = stream.cursor();
        let rest: Vec<_> = resolver
            .records_from(cursor)
            .map(|record| record.cell_address)
            .collect();
        assert_eq!(rest, ["B1", "A2"]);
    }
}
