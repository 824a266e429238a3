//! Column naming from a sheet's header row.
//!
//! One left-to-right pass over the header cells:
//!
//! 1. A follower of a merged header takes the anchor's label suffixed with its own column
//!    letters ("Period [C]"). The first follower also suffixes the anchor column's entry
//!    ("Period [B]") so every spanned column ends up distinct.
//! 2. A blank header falls back to the column letters ("D").
//! 3. A header already taken is suffixed with the column letters ("Name [C]").
//! 4. Columns past the header row but present in wider data rows get letter names.
//!
//! Any candidate that still collides keeps receiving the suffix until it is unique.

use crate::database::column::ColumnSchema;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::merge::AnchorResolution;
use crate::spreadsheet::merge::MergeIndex;
use crate::spreadsheet::reference::column_letters;
use tracing::trace;

/// Derives a [`ColumnSchema`] from a header row and the sheet's merged regions.
pub(crate) struct HeaderResolver<'a> {
    merges: &'a MergeIndex,
}

impl<'a> HeaderResolver<'a> {
    pub(crate) fn new(merges: &'a MergeIndex) -> Self {
        Self { merges }
    }

    /// Returns true if the header row can back a table: it must be non-empty and its first
    /// cell must hold a value.
    pub(crate) fn is_table_header(header: &[CellValue]) -> bool {
        header.first().map(|cell| !cell.is_empty()).unwrap_or(false)
    }

    /// Resolves column names for `header` (row 1, starting at column A). `width` is the
    /// widest row observed in the sheet; positions beyond the header get letter names.
    pub(crate) fn resolve(&self, header: &[CellValue], width: usize) -> ColumnSchema {
        let mut schema = ColumnSchema::default();
        for (index, cell) in header.iter().enumerate() {
            let col = index + 1;
            let name = match self.merges.resolve(1, col) {
                AnchorResolution::Follower { col: anchor_col, .. } => {
                    let label = header
                        .get(anchor_col - 1)
                        .map(CellValue::value)
                        .unwrap_or("");
                    if label.is_empty() {
                        column_letters(col)
                    } else {
                        if anchor_col + 1 == col {
                            Self::suffix_anchor(&mut schema, label, anchor_col);
                        }
                        format!("{} [{}]", label, column_letters(col))
                    }
                }
                AnchorResolution::NotMerged if cell.is_empty() => column_letters(col),
                AnchorResolution::NotMerged => cell.value().to_owned(),
            };
            let name = Self::unique(&schema, name, col);
            trace!(column = col, name = name.as_str(), "resolved header");
            schema.push(name);
        }
        for col in (header.len() + 1)..=width {
            let name = Self::unique(&schema, column_letters(col), col);
            schema.push(name);
        }
        schema
    }

    /// Suffixes the entry emitted for the anchor column, unless it is already suffixed.
    fn suffix_anchor(schema: &mut ColumnSchema, label: &str, anchor_col: usize) {
        let is_bare = schema.get(anchor_col - 1) == Some(label) && schema.len() == anchor_col;
        if is_bare {
            if let Some(last) = schema.last_mut() {
                last.clear();
            }
            let suffixed = Self::unique(schema, format!("{} [{}]", label, column_letters(anchor_col)), anchor_col);
            if let Some(last) = schema.last_mut() {
                *last = suffixed;
            }
        }
    }

    fn unique(schema: &ColumnSchema, name: String, col: usize) -> String {
        let mut name = name;
        while schema.contains(&name) {
            name = format!("{} [{}]", name, column_letters(col));
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::merge::MergeRange;

    fn header(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|value| CellValue::text(value)).collect()
    }

    fn resolve(values: &[&str], merges: &[MergeRange], width: usize) -> Vec<String> {
        let merges = MergeIndex::new(merges);
        HeaderResolver::new(&merges)
            .resolve(&header(values), width)
            .names()
            .to_vec()
    }

    #[test]
    fn blank_and_duplicate_headers() {
        assert_eq!(resolve(&["", "Name", "Name", ""], &[], 4), ["A", "Name", "Name [C]", "D"]);
    }

    #[test]
    fn merged_header_spanning_three_columns() {
        let names = resolve(&["Col A", "", ""], &[MergeRange::new(0, 1, 0, 3)], 3);
        assert_eq!(names, ["Col A [A]", "Col A [B]", "Col A [C]"]);
    }

    #[test]
    fn merged_header_in_the_middle() {
        let names = resolve(&["ID", "Period", "", "", "Total"], &[MergeRange::new(0, 1, 1, 4)], 5);
        assert_eq!(names, ["ID", "Period [B]", "Period [C]", "Period [D]", "Total"]);
    }

    #[test]
    fn block_merged_header() {
        let names = resolve(&["Title", ""], &[MergeRange::new(0, 2, 0, 2)], 2);
        assert_eq!(names, ["Title [A]", "Title [B]"]);
    }

    #[test]
    fn blank_merged_header_falls_back_to_letters() {
        let names = resolve(&["ID", "", ""], &[MergeRange::new(0, 1, 1, 3)], 3);
        assert_eq!(names, ["ID", "B", "C"]);
    }

    #[test]
    fn wider_data_rows_extend_schema() {
        assert_eq!(resolve(&["ID", "Name"], &[], 4), ["ID", "Name", "C", "D"]);
        assert_eq!(resolve(&["ID", "Name"], &[], 1), ["ID", "Name"]);
    }

    #[test]
    fn fallback_names_stay_unique() {
        assert_eq!(resolve(&["B", ""], &[], 2), ["B", "B [B]"]);
        assert_eq!(resolve(&["C", "x"], &[], 3), ["C", "x", "C [C]"]);
        assert_eq!(resolve(&["x [B]", "x", ""], &[MergeRange::new(0, 1, 1, 3)], 3), ["x [B]", "x [B] [B]", "x [C]"]);
    }

    #[test]
    fn table_header_detection() {
        assert!(HeaderResolver::is_table_header(&header(&["ID", ""])));
        assert!(!HeaderResolver::is_table_header(&header(&["", "Name"])));
        assert!(!HeaderResolver::is_table_header(&[]));
    }
}
