use crate::error::RustyGsheetError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::row_to_index;
use regex::Regex;
use thiserror::Error;

/// Errors related to A1-style range parsing.
#[derive(Error, Debug)]
pub(crate) enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),

    #[error("Unterminated quoted sheet name in '{0}'")]
    QuoteError(String),
}

/// Represents an A1-style cell range with optional boundaries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Range {
    /// Lower row bound (0-based index), None for unbounded
    pub(crate) row_lower_bound: Option<usize>,
    /// Upper row bound (0-based index, inclusive), None for unbounded
    pub(crate) row_upper_bound: Option<usize>,
    /// Lower column bound (0-based index), None for unbounded
    pub(crate) col_lower_bound: Option<usize>,
    /// Upper column bound (0-based index, inclusive), None for unbounded
    pub(crate) col_upper_bound: Option<usize>,
}

impl TryFrom<&str> for Range {
    type Error = RustyGsheetError;

    /// Parses an A1-style range string (e.g., "A1", "B2:C5", "A", "1:10", "A1:").
    /// Without a colon the upper bounds repeat the lower ones, so "A1" is a single cell;
    /// with a colon and nothing after it the range is open-ended.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^([A-Z]*)(\d*)(:([A-Z]*)(\d*))?$").expect("Hardcode regex pattern");
        let value = value.trim().to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .ok_or(RangeError::FormatError(value.to_owned()))?;
        // A present component that does not convert (column past ZZZ, row 0) is an error
        let bound = |group: usize, convert: fn(&str) -> Option<usize>| -> Result<Option<usize>, RangeError> {
            match captures.get(group).map(|matcher| matcher.as_str()).filter(|text| !text.is_empty()) {
                Some(text) => convert(text).map(Some).ok_or(RangeError::FormatError(value.to_owned())),
                None => Ok(None),
            }
        };
        let col_lower_bound = bound(1, col_to_index)?;
        let row_lower_bound = bound(2, row_to_index)?;
        if captures.get(3).is_none() {
            return Ok(Range {
                row_lower_bound,
                row_upper_bound: row_lower_bound,
                col_lower_bound,
                col_upper_bound: col_lower_bound,
            });
        }
        Ok(Range {
            col_lower_bound,
            row_lower_bound,
            col_upper_bound: bound(4, col_to_index)?,
            row_upper_bound: bound(5, row_to_index)?,
        })
    }
}

/// A range expression as sent to the data source: an optional sheet plus an optional
/// cell range ("'My Sheet'!B2", "Sheet1", "A1:C3").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RangeExpr {
    /// Unquoted sheet name
    pub(crate) sheet: Option<String>,
    pub(crate) range: Option<Range>,
}

impl TryFrom<&str> for RangeExpr {
    type Error = RustyGsheetError;

    /// Splits "Sheet!A1:B2" into its sheet and range. A string without '!' is taken as a
    /// bare sheet name; it is up to the data source to fall back to reading it as a range.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if let Some(rest) = value.strip_prefix('\'') {
            let (name, tail) = split_quoted(rest).ok_or_else(|| RangeError::QuoteError(value.to_owned()))?;
            let range = match tail.strip_prefix('!') {
                Some(range) if !range.is_empty() => Some(Range::try_from(range)?),
                Some(_) => None,
                None if tail.is_empty() => None,
                None => Err(RangeError::FormatError(value.to_owned()))?,
            };
            return Ok(RangeExpr {
                sheet: Some(name),
                range,
            });
        }
        match value.rsplit_once('!') {
            Some((sheet, range)) => Ok(RangeExpr {
                sheet: Some(sheet.to_owned()),
                range: if range.is_empty() {
                    None
                } else {
                    Some(Range::try_from(range)?)
                },
            }),
            None => Ok(RangeExpr {
                sheet: Some(value.to_owned()),
                range: None,
            }),
        }
    }
}

/// Reads a quoted name up to its closing quote, undoubling inner quotes. Returns the name
/// and whatever follows the closing quote.
fn split_quoted(rest: &str) -> Option<(String, &str)> {
    let mut name = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((index, char)) = chars.next() {
        if char != '\'' {
            name.push(char);
        } else if matches!(chars.peek(), Some((_, '\''))) {
            name.push('\'');
            chars.next();
        } else {
            return Some((name, &rest[index + 1..]));
        }
    }
    None
}

/// Quotes a sheet name for use in a range expression, doubling inner quotes. A quoted
/// name is never mistaken for a range such as "A" or "AB12".
pub(crate) fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Strips the quotes a data source may put around a sheet name.
pub(crate) fn unquote_sheet_name(name: &str) -> String {
    name.strip_prefix('\'')
        .and_then(|rest| split_quoted(rest))
        .filter(|(_, tail)| tail.is_empty())
        .map(|(name, _)| name)
        .unwrap_or_else(|| name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(value: &str) -> Range {
        Range::try_from(value).unwrap()
    }

    #[test]
    fn range_single_cell() {
        assert_eq!(
            range("b3"),
            Range {
                row_lower_bound: Some(2),
                row_upper_bound: Some(2),
                col_lower_bound: Some(1),
                col_upper_bound: Some(1),
            }
        );
    }

    #[test]
    fn range_partial_bounds() {
        let open = range("A1:");
        assert_eq!(open.row_lower_bound, Some(0));
        assert_eq!(open.row_upper_bound, None);
        assert_eq!(open.col_upper_bound, None);

        let rows = range("3:3");
        assert_eq!((rows.row_lower_bound, rows.row_upper_bound), (Some(2), Some(2)));
        assert_eq!((rows.col_lower_bound, rows.col_upper_bound), (None, None));

        let cols = range("C:D");
        assert_eq!((cols.col_lower_bound, cols.col_upper_bound), (Some(2), Some(3)));
    }

    #[test]
    fn range_rejects_garbage() {
        assert!(Range::try_from("A1-B2").is_err());
        assert!(Range::try_from("1A").is_err());
        assert!(Range::try_from("People").is_err());
        assert!(Range::try_from("AAAA1").is_err());
        assert!(Range::try_from("A0").is_err());
        assert!(Range::try_from("A1:B0").is_err());
    }

    #[test]
    fn expression_split() {
        let expr = RangeExpr::try_from("Sheet1!A1:B2").unwrap();
        assert_eq!(expr.sheet.as_deref(), Some("Sheet1"));
        assert_eq!(expr.range, Some(range("A1:B2")));

        let expr = RangeExpr::try_from("'It''s here'!C3").unwrap();
        assert_eq!(expr.sheet.as_deref(), Some("It's here"));
        assert_eq!(expr.range, Some(range("C3")));

        let expr = RangeExpr::try_from("'Q1 Sales'").unwrap();
        assert_eq!(expr.sheet.as_deref(), Some("Q1 Sales"));
        assert_eq!(expr.range, None);

        let expr = RangeExpr::try_from("Summary").unwrap();
        assert_eq!(expr.sheet.as_deref(), Some("Summary"));
        assert_eq!(expr.range, None);

        let expr = RangeExpr::try_from("Data!").unwrap();
        assert_eq!(expr.sheet.as_deref(), Some("Data"));
        assert_eq!(expr.range, None);

        assert!(RangeExpr::try_from("'broken!A1").is_err());
    }

    #[test]
    fn sheet_name_quoting() {
        assert_eq!(quote_sheet_name("Sheet1"), "'Sheet1'");
        assert_eq!(quote_sheet_name("A"), "'A'");
        assert_eq!(quote_sheet_name("Q1 Sales"), "'Q1 Sales'");
        assert_eq!(quote_sheet_name("It's"), "'It''s'");
        assert_eq!(unquote_sheet_name("'Q1 Sales'"), "Q1 Sales");
        assert_eq!(unquote_sheet_name("'It''s'"), "It's");
        assert_eq!(unquote_sheet_name("Plain"), "Plain");
    }
}
