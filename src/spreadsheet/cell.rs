use crate::spreadsheet::reference::cell_address;
use crate::spreadsheet::reference::column_letters;
use serde::Deserialize;
use std::fmt::Display;

/// Value entered by the user, as opposed to the computed/formatted one.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct EnteredValue {
    /// Formula text, present when the cell holds a formula
    pub(crate) formula_value: Option<String>,
}

/// A single fetched cell: its formatted string plus formula, note and hyperlink metadata.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CellValue {
    /// Value as displayed in the spreadsheet
    pub(crate) formatted_value: Option<String>,
    /// Value as entered by the user
    pub(crate) user_entered_value: Option<EnteredValue>,
    /// User note attached to the cell
    pub(crate) note: Option<String>,
    /// Link target, if the cell holds exactly one hyperlink
    pub(crate) hyperlink: Option<String>,
}

impl CellValue {
    /// Builds a plain cell holding only a formatted value.
    #[cfg(test)]
    pub(crate) fn text(value: &str) -> Self {
        Self {
            formatted_value: Some(value.to_owned()),
            ..Self::default()
        }
    }

    /// Formatted value, empty when absent.
    pub(crate) fn value(&self) -> &str {
        self.formatted_value.as_deref().unwrap_or("")
    }

    pub(crate) fn formula(&self) -> Option<&str> {
        self.user_entered_value
            .as_ref()
            .and_then(|entered| entered.formula_value.as_deref())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.value().is_empty()
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// One row of the cell-granularity table.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CellRecord {
    pub(crate) sheet_name: String,
    /// Column letters ("B")
    pub(crate) column_letter: String,
    /// 1-based row number
    pub(crate) row_number: usize,
    /// A1 address ("B3")
    pub(crate) cell_address: String,
    pub(crate) value: String,
    pub(crate) formula: Option<String>,
    pub(crate) note: Option<String>,
    pub(crate) hyperlink: Option<String>,
}

impl CellRecord {
    /// Describes the cell at the 1-based (row, col) using the data of `owner`, which is
    /// either the cell itself or the anchor of the merge it follows.
    pub(crate) fn new(sheet_name: &str, row: usize, col: usize, owner: &CellValue) -> Self {
        Self {
            sheet_name: sheet_name.to_owned(),
            column_letter: column_letters(col),
            row_number: row,
            cell_address: cell_address(row, col),
            value: owner.value().to_owned(),
            formula: owner.formula().map(str::to_owned),
            note: owner.note.to_owned(),
            hyperlink: owner.hyperlink.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_value_from_api_json() {
        let cell: CellValue = serde_json::from_str(
            r#"{"formattedValue":"42","userEnteredValue":{"formulaValue":"=6*7"},"note":"answer","hyperlink":"https://example.com"}"#,
        )
        .unwrap();
        assert_eq!(cell.value(), "42");
        assert_eq!(cell.formula(), Some("=6*7"));
        assert_eq!(cell.note.as_deref(), Some("answer"));
        assert_eq!(cell.hyperlink.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn empty_cell_object() {
        let cell: CellValue = serde_json::from_str("{}").unwrap();
        assert!(cell.is_empty());
        assert_eq!(cell.formula(), None);
        assert_eq!(cell.to_string(), "");
    }

    #[test]
    fn record_uses_own_address_and_owner_data() {
        let anchor = CellValue {
            note: Some("merged".to_owned()),
            ..CellValue::text("Total")
        };
        let record = CellRecord::new("Sheet1", 3, 2, &anchor);
        assert_eq!(record.column_letter, "B");
        assert_eq!(record.row_number, 3);
        assert_eq!(record.cell_address, "B3");
        assert_eq!(record.value, "Total");
        assert_eq!(record.note.as_deref(), Some("merged"));
        assert_eq!(record.formula, None);
    }
}
