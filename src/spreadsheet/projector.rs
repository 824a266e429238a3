//! Streaming of sheet rows as schema-shaped records.

use crate::database::column::ColumnSchema;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::merge::AnchorResolution;
use crate::spreadsheet::merge::MergeIndex;
use crate::spreadsheet::sheet::Sheet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::trace;

/// Caller-imposed row budget with a cooperative cancellation flag.
///
/// Checked once per emitted row: when the limit is reached or the budget is cancelled,
/// streaming stops before the next row.
#[derive(Debug, Default)]
pub(crate) struct RowBudget {
    limit: Option<usize>,
    emitted: AtomicUsize,
    cancelled: AtomicBool,
}

impl RowBudget {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Rows still wanted, None when unbounded.
    pub(crate) fn remaining(&self) -> Option<usize> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(0);
        }
        self.limit
            .map(|limit| limit.saturating_sub(self.emitted.load(Ordering::Relaxed)))
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Records one emitted row.
    pub(crate) fn record(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Asks the producer to stop before its next row.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// One data row keyed by column name. Positions the source row does not reach are unset.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ProjectedRow {
    schema: Arc<ColumnSchema>,
    /// 1-based row number in the sheet
    pub(crate) row_number: usize,
    values: Vec<Option<String>>,
}

impl ProjectedRow {
    /// Value at a schema position.
    pub(crate) fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|value| value.as_deref())
    }
}

/// Projects the data rows of a sheet window onto a resolved schema, substituting anchor
/// values for merged followers.
pub(crate) struct RowProjector<'a> {
    sheet: &'a Sheet,
    schema: &'a Arc<ColumnSchema>,
    merges: &'a MergeIndex,
}

impl<'a> RowProjector<'a> {
    pub(crate) fn new(sheet: &'a Sheet, schema: &'a Arc<ColumnSchema>, merges: &'a MergeIndex) -> Self {
        Self { sheet, schema, merges }
    }

    /// Index (into the window rows) of the first data row: the header row is skipped when
    /// the window starts at row 1.
    pub(crate) fn first_data_row(&self) -> usize {
        if self.sheet.row_offset == 0 && !self.sheet.is_empty() {
            1
        } else {
            0
        }
    }

    /// Number of data rows in the window.
    pub(crate) fn len(&self) -> usize {
        self.sheet.rows.len() - self.first_data_row()
    }

    /// Projects the data row at `index` (0 = first data row).
    pub(crate) fn project(&self, index: usize) -> Option<ProjectedRow> {
        let position = self.first_data_row() + index;
        let cells = self.sheet.rows.get(position)?;
        let row = self.sheet.first_row() + position;
        let mut values: Vec<Option<String>> = vec![None; self.schema.len()];
        for (offset, cell) in cells.iter().enumerate() {
            let col = self.sheet.first_col() + offset;
            let Some(slot) = values.get_mut(col - 1) else {
                trace!(row, col, "cell beyond schema width ignored");
                continue;
            };
            let owner = match self.merges.resolve(row, col) {
                AnchorResolution::Follower { row, col } => self.sheet.get(row, col),
                AnchorResolution::NotMerged => Some(cell),
            };
            *slot = Some(owner.map(CellValue::value).unwrap_or("").to_owned());
        }
        Some(ProjectedRow {
            schema: self.schema.clone(),
            row_number: row,
            values,
        })
    }

    /// Streams data rows `lower..upper` in source order until the budget runs out.
    pub(crate) fn rows_between(&'a self, lower: usize, upper: usize, budget: &'a RowBudget) -> ProjectedRows<'a> {
        ProjectedRows {
            projector: self,
            budget,
            index: lower,
            upper: upper.min(self.len()),
        }
    }
}

/// Lazy, one-shot stream of projected rows.
pub(crate) struct ProjectedRows<'a> {
    projector: &'a RowProjector<'a>,
    budget: &'a RowBudget,
    index: usize,
    upper: usize,
}

impl Iterator for ProjectedRows<'_> {
    type Item = ProjectedRow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.upper || self.budget.is_exhausted() {
            return None;
        }
        let row = self.projector.project(self.index)?;
        self.index += 1;
        self.budget.record();
        Some(row)
    }
}
