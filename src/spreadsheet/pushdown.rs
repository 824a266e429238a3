//! Translation of query predicates into the narrowest range expressions to fetch.
//!
//! Precedence, most specific first: explicit range, cell, row and column together, row,
//! column, sheet names. Without any predicate the whole spreadsheet is read.

use crate::database::range::quote_sheet_name;
use tracing::debug;

/// Predicates pushed down by the caller. Sheet names are unquoted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Predicates {
    pub(crate) sheets: Vec<String>,
    /// A1 range, optionally sheet-qualified
    pub(crate) range: Option<String>,
    /// A1 cell address
    pub(crate) cell: Option<String>,
    /// 1-based row number
    pub(crate) row: Option<usize>,
    /// Column letters
    pub(crate) column: Option<String>,
}

/// What to request from the data source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RangePlan {
    /// Every sheet, in full
    All,
    /// These range expressions, in order
    Ranges(Vec<String>),
}

pub(crate) struct PushdownPlanner;

impl PushdownPlanner {
    /// Plans the fetch for `predicates`. Predicates finer than a sheet but without one apply
    /// to every sheet in `available`.
    pub(crate) fn plan(predicates: &Predicates, available: &[String]) -> RangePlan {
        let plan = Self::plan_ranges(predicates, available);
        debug!(?predicates, ?plan, "planned fetch");
        plan
    }

    fn plan_ranges(predicates: &Predicates, available: &[String]) -> RangePlan {
        let sheets = if predicates.sheets.is_empty() {
            available
        } else {
            predicates.sheets.as_slice()
        };
        let qualify = |suffix: &str| -> RangePlan {
            RangePlan::Ranges(
                sheets
                    .iter()
                    .map(|sheet| format!("{}!{}", quote_sheet_name(sheet), suffix))
                    .collect(),
            )
        };
        let column = predicates
            .column
            .as_deref()
            .map(|column| column.trim().to_ascii_uppercase())
            .filter(|column| !column.is_empty());

        if let Some(range) = predicates.range.as_deref().map(str::trim).filter(|range| !range.is_empty()) {
            if range.contains('!') || predicates.sheets.is_empty() {
                return RangePlan::Ranges(vec![range.to_owned()]);
            }
            return qualify(range);
        }
        if let Some(cell) = predicates.cell.as_deref().map(str::trim).filter(|cell| !cell.is_empty()) {
            return qualify(&cell.to_ascii_uppercase());
        }
        match (predicates.row, column) {
            (Some(row), Some(column)) => qualify(&format!("{}{}", column, row)),
            (Some(row), None) => qualify(&format!("{}:{}", row, row)),
            (None, Some(column)) => qualify(&format!("{}:{}", column, column)),
            (None, None) if predicates.sheets.is_empty() => RangePlan::All,
            (None, None) => RangePlan::Ranges(
                predicates
                    .sheets
                    .iter()
                    .map(|sheet| quote_sheet_name(sheet))
                    .collect(),
            ),
        }
    }
}
