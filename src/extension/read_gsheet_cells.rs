use crate::database::column::ColumnType;
use crate::database::range::quote_sheet_name;
use crate::error::ResultMessage;
use crate::error::RustyGsheetError;
use crate::extension::schema_registry;
use crate::extension::writer::bigint;
use crate::extension::writer::write_to_vector;
use crate::extension::writer::OutputValue;
use crate::extension::CellParam;
use crate::extension::ColumnParam;
use crate::extension::LimitParam;
use crate::extension::NamedParam;
use crate::extension::Param;
use crate::extension::RangeParam;
use crate::extension::RowParam;
use crate::extension::SheetNameParam;
use crate::extension::SpreadsheetParam;
use crate::extension::CHUNK_SIZE;
use crate::spreadsheet::catalog::Catalog;
use crate::spreadsheet::catalog::ConnectionConfig;
use crate::spreadsheet::merge::MergeIndex;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::projector::RowBudget;
use crate::spreadsheet::pushdown::Predicates;
use crate::spreadsheet::pushdown::PushdownPlanner;
use crate::spreadsheet::pushdown::RangePlan;
use crate::spreadsheet::registry::SchemaRegistry;
use crate::spreadsheet::resolver::CellAddressResolver;
use crate::spreadsheet::resolver::CellCursor;
use crate::spreadsheet::sheet::Sheet;
use duckdb::core::DataChunkHandle;
use duckdb::core::LogicalTypeHandle;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::Mutex;
use tracing::debug;

/// Output columns, in order.
const COLUMNS: [(&str, ColumnType); 10] = [
    ("spreadsheet_id", ColumnType::Varchar),
    ("sheet_name", ColumnType::Varchar),
    ("column_letter", ColumnType::Varchar),
    ("row_number", ColumnType::BigInt),
    ("cell_address", ColumnType::Varchar),
    ("value", ColumnType::Varchar),
    ("formula", ColumnType::Varchar),
    ("note", ColumnType::Varchar),
    ("hyperlink", ColumnType::Varchar),
    ("range", ColumnType::Varchar),
];

/// Parameters for reading individual cells.
struct ReadGsheetCellsParameters {
    /// Path or URL of the spreadsheet document
    spreadsheet: String,
    /// Sheet names or glob patterns (default: all sheets)
    sheet_name: Option<Vec<String>>,
    range: Option<String>,
    cell: Option<String>,
    row: Option<usize>,
    column: Option<String>,
    /// Maximum number of cells to emit
    limit: Option<usize>,
}

impl TryFrom<&BindInfo> for ReadGsheetCellsParameters {
    type Error = RustyGsheetError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        Ok(ReadGsheetCellsParameters {
            spreadsheet: SpreadsheetParam::read(bind, 0)?,
            sheet_name: SheetNameParam::read(bind)?,
            range: RangeParam::read(bind)?,
            cell: CellParam::read(bind)?,
            row: RowParam::read(bind)?,
            column: ColumnParam::read(bind)?,
            limit: LimitParam::read(bind)?,
        })
    }
}

#[repr(C)]
/// Fetched windows to report cells from.
pub(crate) struct ReadGsheetCellsBindData {
    /// Identifier reported by the document
    spreadsheet_id: String,
    /// Requested range, echoed on every row
    range: Option<String>,
    windows: Vec<(Sheet, MergeIndex)>,
    limit: Option<usize>,
}

impl ReadGsheetCellsBindData {
    fn load(parameters: &ReadGsheetCellsParameters, registry: &SchemaRegistry) -> Result<Self, RustyGsheetError> {
        let selection = parameters.sheet_name.to_owned().unwrap_or_default();
        let config = ConnectionConfig::new(&parameters.spreadsheet, selection.to_owned())?;
        let source = open_spreadsheet(&config.spreadsheet)?;
        let catalog = Catalog::new(&config, source.as_ref(), registry);
        let available = catalog.discover_sheets()?;
        let mut data = ReadGsheetCellsBindData {
            spreadsheet_id: source.spreadsheet_id().to_owned(),
            range: parameters.range.to_owned(),
            windows: Vec::new(),
            limit: parameters.limit,
        };
        if !selection.is_empty() && available.is_empty() {
            debug!(?selection, "no sheet matches the selection");
            return Ok(data);
        }

        let predicates = Predicates {
            sheets: if selection.is_empty() { Vec::new() } else { available.to_owned() },
            range: parameters.range.to_owned(),
            cell: parameters.cell.to_owned(),
            row: parameters.row,
            column: parameters.column.to_owned(),
        };
        let ranges = match PushdownPlanner::plan(&predicates, &available) {
            RangePlan::All => available.iter().map(|sheet| quote_sheet_name(sheet)).collect(),
            RangePlan::Ranges(ranges) => ranges,
        };
        data.windows = catalog
            .fetch_windows(&ranges, true)?
            .into_iter()
            .map(|window| {
                let merges = window.merge_index();
                (window, merges)
            })
            .collect();
        Ok(data)
    }
}

#[repr(C)]
pub(crate) struct ReadGsheetCellsInitData {
    /// Next (window, cell) to visit
    cursor: Mutex<(usize, CellCursor)>,
    budget: RowBudget,
}

/// Table function listing non-empty cells with their address, formula, note and link.
pub(crate) struct ReadGsheetCellsTableFunction;

impl VTab for ReadGsheetCellsTableFunction {
    type InitData = ReadGsheetCellsInitData;
    type BindData = ReadGsheetCellsBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let registry = schema_registry(bind, "read_gsheet_cells")?;
        let parameters = ReadGsheetCellsParameters::try_from(bind)?;
        let data = ReadGsheetCellsBindData::load(&parameters, &registry).with_prefix(parameters.spreadsheet.as_str())?;
        for (name, kind) in COLUMNS {
            bind.add_result_column(name, LogicalTypeHandle::from(kind.to_logical_type_id()));
        }
        Ok(data)
    }

    fn init(init: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        let bind: *const Self::BindData = init.get_bind_data();
        let limit = unsafe { (*bind).limit };
        Ok(ReadGsheetCellsInitData {
            cursor: Mutex::new((0, (0, 0))),
            budget: RowBudget::new(limit),
        })
    }

    fn func(func: &TableFunctionInfo<Self>, output: &mut DataChunkHandle) -> Result<(), Box<dyn Error>> {
        let bind = func.get_bind_data();
        let init = func.get_init_data();
        if init.budget.is_exhausted() {
            output.set_len(0);
            return Ok(());
        }
        let mut cursor = init.cursor.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut vectors: Vec<_> = (0..COLUMNS.len()).map(|index| output.flat_vector(index)).collect();
        let mut count = 0;
        while count < CHUNK_SIZE && !init.budget.is_exhausted() {
            let (window, position) = *cursor;
            let Some((sheet, merges)) = bind.windows.get(window) else {
                // Later chunks return before taking the lock
                init.budget.cancel();
                debug!(cells = init.budget.emitted(), "scan finished");
                break;
            };
            let resolver = CellAddressResolver::new(sheet, merges);
            let mut records = resolver.records_from(position);
            let mut finished = false;
            while count < CHUNK_SIZE && !init.budget.is_exhausted() {
                let Some(record) = records.next() else {
                    finished = true;
                    break;
                };
                let values = [
                    OutputValue::Varchar(&bind.spreadsheet_id),
                    OutputValue::Varchar(&record.sheet_name),
                    OutputValue::Varchar(&record.column_letter),
                    bigint(record.row_number),
                    OutputValue::Varchar(&record.cell_address),
                    OutputValue::Varchar(&record.value),
                    OutputValue::from(record.formula.as_deref()),
                    OutputValue::from(record.note.as_deref()),
                    OutputValue::from(record.hyperlink.as_deref()),
                    OutputValue::from(bind.range.as_deref()),
                ];
                for (vector, value) in vectors.iter_mut().zip(values) {
                    write_to_vector(vector, count, value);
                }
                init.budget.record();
                count += 1;
            }
            *cursor = if finished {
                (window + 1, (0, 0))
            } else {
                (window, records.cursor())
            };
        }
        output.set_len(count);
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![SpreadsheetParam::kind()])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
            SheetNameParam::definition(),
            RangeParam::definition(),
            CellParam::definition(),
            RowParam::definition(),
            ColumnParam::definition(),
            LimitParam::definition(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DOCUMENT: &str = r#"{"spreadsheetId": "sheet-123", "sheets": [
        {"properties": {"title": "People"},
         "data": [{"rowData": [
            {"values": [{"formattedValue": "ID"}, {"formattedValue": "Team"}]},
            {"values": [{"formattedValue": "1"}, {"formattedValue": "Red", "note": "lead"}]},
            {"values": [{"formattedValue": "2"}, {}]}
         ]}],
         "merges": [{"startRowIndex": 1, "endRowIndex": 3, "startColumnIndex": 1, "endColumnIndex": 2}]},
        {"properties": {"title": "Q1 Sales"},
         "data": [{"rowData": [
            {"values": [{"formattedValue": "Total"}]},
            {"values": [{"formattedValue": "42", "userEnteredValue": {"formulaValue": "=SUM(B:B)"}}]}
         ]}]}
    ]}"#;

    fn document() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();
        file
    }

    fn parameters(file: &NamedTempFile) -> ReadGsheetCellsParameters {
        ReadGsheetCellsParameters {
            spreadsheet: file.path().to_str().unwrap().to_owned(),
            sheet_name: None,
            range: None,
            cell: None,
            row: None,
            column: None,
            limit: None,
        }
    }

    /// "Sheet!A1=value" for every reported cell, in scan order.
    fn cells(data: &ReadGsheetCellsBindData) -> Vec<String> {
        data.windows
            .iter()
            .flat_map(|(sheet, merges)| {
                CellAddressResolver::new(sheet, merges)
                    .records_from((0, 0))
                    .map(|record| format!("{}!{}={}", record.sheet_name, record.cell_address, record.value))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn every_sheet_without_selection() {
        let file = document();
        let data = ReadGsheetCellsBindData::load(&parameters(&file), &SchemaRegistry::new()).unwrap();
        assert_eq!(data.spreadsheet_id, "sheet-123");
        assert_eq!(data.range, None);
        assert_eq!(
            cells(&data),
            [
                "People!A1=ID",
                "People!B1=Team",
                "People!A2=1",
                "People!B2=Red",
                "People!A3=2",
                "People!B3=Red",
                "Q1 Sales!A1=Total",
                "Q1 Sales!A2=42",
            ]
        );
    }

    #[test]
    fn selected_sheets_only() {
        let file = document();
        let parameters = ReadGsheetCellsParameters {
            sheet_name: Some(vec!["Q1*".to_owned()]),
            ..parameters(&file)
        };
        let data = ReadGsheetCellsBindData::load(&parameters, &SchemaRegistry::new()).unwrap();
        assert_eq!(cells(&data), ["Q1 Sales!A1=Total", "Q1 Sales!A2=42"]);

        let parameters = ReadGsheetCellsParameters {
            sheet_name: Some(vec!["Missing".to_owned()]),
            ..parameters
        };
        let data = ReadGsheetCellsBindData::load(&parameters, &SchemaRegistry::new()).unwrap();
        assert!(data.windows.is_empty());
    }

    #[test]
    fn row_applies_to_every_selected_sheet() {
        let file = document();
        let parameters = ReadGsheetCellsParameters {
            row: Some(2),
            ..parameters(&file)
        };
        let data = ReadGsheetCellsBindData::load(&parameters, &SchemaRegistry::new()).unwrap();
        assert_eq!(cells(&data), ["People!A2=1", "People!B2=Red", "Q1 Sales!A2=42"]);
    }

    #[test]
    fn merged_follower_outside_anchor_window() {
        let file = document();
        let parameters = ReadGsheetCellsParameters {
            sheet_name: Some(vec!["People".to_owned()]),
            cell: Some("B3".to_owned()),
            ..parameters(&file)
        };
        let data = ReadGsheetCellsBindData::load(&parameters, &SchemaRegistry::new()).unwrap();
        let (sheet, merges) = &data.windows[0];
        let record = CellAddressResolver::new(sheet, merges).resolve(3, 2).unwrap();
        assert_eq!(record.value, "Red");
        assert_eq!(record.note.as_deref(), Some("lead"));
    }

    #[test]
    fn range_is_echoed_and_read_verbatim() {
        let file = document();
        let parameters = ReadGsheetCellsParameters {
            range: Some("'Q1 Sales'!A2".to_owned()),
            ..parameters(&file)
        };
        let data = ReadGsheetCellsBindData::load(&parameters, &SchemaRegistry::new()).unwrap();
        assert_eq!(data.range.as_deref(), Some("'Q1 Sales'!A2"));
        assert_eq!(cells(&data), ["Q1 Sales!A2=42"]);
        let (sheet, merges) = &data.windows[0];
        let record = CellAddressResolver::new(sheet, merges).resolve(2, 1).unwrap();
        assert_eq!(record.formula.as_deref(), Some("=SUM(B:B)"));
    }

    #[test]
    fn unknown_sheet_in_range_is_an_error() {
        let file = document();
        let parameters = ReadGsheetCellsParameters {
            range: Some("Nope!A1".to_owned()),
            ..parameters(&file)
        };
        assert!(ReadGsheetCellsBindData::load(&parameters, &SchemaRegistry::new()).is_err());
    }
}
