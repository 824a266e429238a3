use crate::database::column::ColumnSchema;
use crate::database::range::quote_sheet_name;
use crate::error::ResultMessage;
use crate::error::RustyGsheetError;
use crate::extension::schema_registry;
use crate::extension::writer::write_to_vector;
use crate::extension::writer::OutputValue;
use crate::extension::CellParam;
use crate::extension::ColumnParam;
use crate::extension::LimitParam;
use crate::extension::NamedParam;
use crate::extension::Param;
use crate::extension::RangeParam;
use crate::extension::RowParam;
use crate::extension::SheetParam;
use crate::extension::SpreadsheetParam;
use crate::extension::CHUNK_SIZE;
use crate::spreadsheet::catalog::Catalog;
use crate::spreadsheet::catalog::ConnectionConfig;
use crate::spreadsheet::merge::MergeIndex;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::projector::RowBudget;
use crate::spreadsheet::projector::RowProjector;
use crate::spreadsheet::pushdown::Predicates;
use crate::spreadsheet::pushdown::PushdownPlanner;
use crate::spreadsheet::pushdown::RangePlan;
use crate::spreadsheet::registry::SchemaRegistry;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use duckdb::core::DataChunkHandle;
use duckdb::core::LogicalTypeHandle;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::Arc;
use std::sync::Mutex;
use tracing::debug;
use tracing::warn;

/// Parameters for reading one sheet as a table.
struct ReadGsheetParameters {
    /// Path or URL of the spreadsheet document
    spreadsheet: String,
    /// Sheet to read (default: first sheet)
    sheet: Option<String>,
    /// Range pushdown, optionally sheet-qualified
    range: Option<String>,
    /// Cell pushdown (A1 address)
    cell: Option<String>,
    /// Row pushdown (1-based)
    row: Option<usize>,
    /// Column pushdown (letters)
    column: Option<String>,
    /// Maximum number of rows to emit
    limit: Option<usize>,
}

impl TryFrom<&BindInfo> for ReadGsheetParameters {
    type Error = RustyGsheetError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        Ok(ReadGsheetParameters {
            spreadsheet: SpreadsheetParam::read(bind, 0)?,
            sheet: SheetParam::read(bind)?,
            range: RangeParam::read(bind)?,
            cell: CellParam::read(bind)?,
            row: RowParam::read(bind)?,
            column: ColumnParam::read(bind)?,
            limit: LimitParam::read(bind)?,
        })
    }
}

#[repr(C)]
/// Schema and fetched windows of the sheet being read.
pub(crate) struct ReadGsheetBindData {
    /// Column names, shared with the schema registry
    schema: Arc<ColumnSchema>,
    /// Fetched windows with their merge indexes, in fetch order
    windows: Vec<(Sheet, MergeIndex)>,
    /// Row budget requested by the caller
    limit: Option<usize>,
}

impl ReadGsheetBindData {
    /// Resolves the schema through the registry and fetches the planned windows.
    fn load(parameters: &ReadGsheetParameters, registry: &SchemaRegistry) -> Result<Self, RustyGsheetError> {
        let config = ConnectionConfig::new(&parameters.spreadsheet, Vec::new())?;
        let source = open_spreadsheet(&config.spreadsheet)?;
        let catalog = Catalog::new(&config, source.as_ref(), registry);
        let available = catalog.discover_sheets()?;
        let sheet_name = match &parameters.sheet {
            Some(sheet) if available.contains(sheet) => sheet.to_owned(),
            Some(sheet) => Err(SpreadsheetError::SourceFetchError(
                config.spreadsheet.to_owned(),
                format!("Unknown sheet '{}'", sheet),
            ))?,
            None => available
                .into_iter()
                .next()
                .ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(config.spreadsheet.to_owned()))?,
        };
        let schema = catalog
            .build_schema(&sheet_name)?
            .ok_or_else(|| SpreadsheetError::NoTableError(config.spreadsheet.to_owned(), sheet_name.to_owned()))?;

        let predicates = Predicates {
            sheets: vec![sheet_name.to_owned()],
            range: parameters.range.to_owned(),
            cell: parameters.cell.to_owned(),
            row: parameters.row,
            column: parameters.column.to_owned(),
        };
        let ranges = match PushdownPlanner::plan(&predicates, &[]) {
            RangePlan::All => vec![quote_sheet_name(&sheet_name)],
            RangePlan::Ranges(ranges) => ranges,
        };
        let windows = catalog
            .fetch_windows(&ranges, true)?
            .into_iter()
            .filter(|window| {
                let same = window.name == sheet_name;
                if !same {
                    warn!(sheet = sheet_name.as_str(), other = window.name.as_str(), "ignoring range of another sheet");
                }
                same
            })
            .map(|window| {
                let merges = window.merge_index();
                (window, merges)
            })
            .collect();
        Ok(ReadGsheetBindData {
            schema,
            windows,
            limit: parameters.limit,
        })
    }
}

#[repr(C)]
/// Streaming state of one scan.
pub(crate) struct ReadGsheetInitData {
    /// Next (window, data row) to emit
    cursor: Mutex<(usize, usize)>,
    /// Caller budget shared by every chunk of the scan
    budget: RowBudget,
    /// Column indices that should be projected (output) from the source data
    projections: Vec<usize>,
}

/// Table function exposing one sheet as a table whose columns come from its header row.
pub(crate) struct ReadGsheetTableFunction;

impl VTab for ReadGsheetTableFunction {
    type InitData = ReadGsheetInitData;
    type BindData = ReadGsheetBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let registry = schema_registry(bind, "read_gsheet")?;
        let parameters = ReadGsheetParameters::try_from(bind)?;
        let data = ReadGsheetBindData::load(&parameters, &registry).with_prefix(parameters.spreadsheet.as_str())?;
        for column in data.schema.columns() {
            bind.add_result_column(column.name.as_str(), LogicalTypeHandle::from(column.kind.to_logical_type_id()));
        }
        Ok(data)
    }

    fn init(init: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        let bind: *const Self::BindData = init.get_bind_data();
        let limit = unsafe { (*bind).limit };
        let projections = init
            .get_column_indices()
            .into_iter()
            .map(|index| index as usize)
            .collect();
        Ok(ReadGsheetInitData {
            cursor: Mutex::new((0, 0)),
            budget: RowBudget::new(limit),
            projections,
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
        let mut vectors: Vec<_> = (0..init.projections.len()).map(|index| output.flat_vector(index)).collect();
        let mut count = 0;
        while count < CHUNK_SIZE && !init.budget.is_exhausted() {
            let (window, lower) = *cursor;
            let Some((sheet, merges)) = bind.windows.get(window) else {
                // Later chunks return before taking the lock
                init.budget.cancel();
                debug!(rows = init.budget.emitted(), "scan finished");
                break;
            };
            let projector = RowProjector::new(sheet, &bind.schema, merges);
            let mut emitted = 0;
            for record in projector.rows_between(lower, lower + CHUNK_SIZE - count, &init.budget) {
                for (index, col) in init.projections.iter().enumerate() {
                    write_to_vector(&mut vectors[index], count, OutputValue::from(record.value(*col)));
                }
                count += 1;
                emitted += 1;
            }
            *cursor = if lower + emitted >= projector.len() {
                (window + 1, 0)
            } else {
                (window, lower + emitted)
            };
        }
        output.set_len(count);
        Ok(())
    }

    fn supports_pushdown() -> bool {
        true
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![SpreadsheetParam::kind()])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
            SheetParam::definition(),
            RangeParam::definition(),
            CellParam::definition(),
            RowParam::definition(),
            ColumnParam::definition(),
            LimitParam::definition(),
        ])
    }
}
