use crate::database::column::ColumnType;
use crate::error::ResultMessage;
use crate::error::RustyGsheetError;
use crate::extension::schema_registry;
use crate::extension::writer::bigint;
use crate::extension::writer::write_to_vector;
use crate::extension::writer::OutputValue;
use crate::extension::NamedParam;
use crate::extension::Param;
use crate::extension::SheetsParam;
use crate::extension::SpreadsheetParam;
use crate::extension::CHUNK_SIZE;
use crate::spreadsheet::catalog::Catalog;
use crate::spreadsheet::catalog::ConnectionConfig;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::registry::SchemaRegistry;
use duckdb::core::DataChunkHandle;
use duckdb::core::LogicalTypeHandle;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

const COLUMNS: [(&str, ColumnType); 3] = [
    ("sheet_name", ColumnType::Varchar),
    ("column_index", ColumnType::BigInt),
    ("column_name", ColumnType::Varchar),
];

/// Parameters for listing the tables of a spreadsheet
struct GsheetTablesParameters {
    /// Path or URL of the spreadsheet document
    spreadsheet: String,
    /// Sheet names or glob patterns (default: all sheets)
    sheets: Option<Vec<String>>,
}

impl TryFrom<&BindInfo> for GsheetTablesParameters {
    type Error = RustyGsheetError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        Ok(GsheetTablesParameters {
            spreadsheet: SpreadsheetParam::read(bind, 0)?,
            sheets: SheetsParam::read(bind)?,
        })
    }
}

#[repr(C)]
/// Binding data containing one entry per table column
pub(crate) struct GsheetTablesBindData {
    /// Tuples of (sheet_name, column_index, column_name)
    columns: Vec<(String, usize, String)>,
}

impl GsheetTablesBindData {
    /// Discovers every table of the spreadsheet and flattens their schemas.
    fn load(parameters: &GsheetTablesParameters, registry: &SchemaRegistry) -> Result<Self, RustyGsheetError> {
        let config = ConnectionConfig::new(&parameters.spreadsheet, parameters.sheets.to_owned().unwrap_or_default())?;
        let source = open_spreadsheet(&config.spreadsheet)?;
        let catalog = Catalog::new(&config, source.as_ref(), registry);
        let mut columns = Vec::new();
        for table in catalog.tables()? {
            for (index, name) in table.schema.names().iter().enumerate() {
                columns.push((table.sheet_name.to_owned(), index + 1, name.to_owned()));
            }
        }
        Ok(GsheetTablesBindData { columns })
    }
}

#[repr(C)]
/// Position of the next column entry to emit
pub(crate) struct GsheetTablesInitData {
    index: AtomicUsize,
}

/// Table function listing the sheets that hold a table, with their column names.
pub(crate) struct GsheetTablesTableFunction;

impl VTab for GsheetTablesTableFunction {
    type InitData = GsheetTablesInitData;
    type BindData = GsheetTablesBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let registry = schema_registry(bind, "gsheet_tables")?;
        let parameters = GsheetTablesParameters::try_from(bind)?;
        let data = GsheetTablesBindData::load(&parameters, &registry).with_prefix(parameters.spreadsheet.as_str())?;
        for (name, kind) in COLUMNS {
            bind.add_result_column(name, LogicalTypeHandle::from(kind.to_logical_type_id()));
        }
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(GsheetTablesInitData {
            index: AtomicUsize::new(0),
        })
    }

    fn func(func: &TableFunctionInfo<Self>, output: &mut DataChunkHandle) -> Result<(), Box<dyn Error>> {
        let init = func.get_init_data();
        let bind = func.get_bind_data();
        let lower = init.index.fetch_add(CHUNK_SIZE, Ordering::Relaxed);
        let upper = bind.columns.len().min(lower + CHUNK_SIZE);
        if lower < upper {
            let mut sheets = output.flat_vector(0);
            let mut indices = output.flat_vector(1);
            let mut names = output.flat_vector(2);
            for index in lower..upper {
                let (sheet_name, column_index, column_name) = &bind.columns[index];
                write_to_vector(&mut sheets, index - lower, OutputValue::Varchar(sheet_name));
                write_to_vector(&mut indices, index - lower, bigint(*column_index));
                write_to_vector(&mut names, index - lower, OutputValue::Varchar(column_name));
            }
            output.set_len(upper - lower);
        } else {
            output.set_len(0);
        }
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![SpreadsheetParam::kind()])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![SheetsParam::definition()])
    }
}
