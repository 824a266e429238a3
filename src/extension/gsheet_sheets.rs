use crate::database::column::ColumnType;
use crate::error::ResultMessage;
use crate::error::RustyGsheetError;
use crate::extension::writer::write_to_vector;
use crate::extension::writer::OutputValue;
use crate::extension::Param;
use crate::extension::SpreadsheetParam;
use crate::extension::CHUNK_SIZE;
use crate::spreadsheet::catalog::ConnectionConfig;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::SheetProperties;
use duckdb::core::DataChunkHandle;
use duckdb::core::LogicalTypeHandle;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

const COLUMNS: [(&str, ColumnType); 10] = [
    ("title", ColumnType::Varchar),
    ("sheet_id", ColumnType::BigInt),
    ("sheet_index", ColumnType::BigInt),
    ("sheet_type", ColumnType::Varchar),
    ("hidden", ColumnType::Boolean),
    ("right_to_left", ColumnType::Boolean),
    ("tab_color", ColumnType::Varchar),
    ("row_count", ColumnType::BigInt),
    ("column_count", ColumnType::BigInt),
    ("merges", ColumnType::Varchar),
];

/// One output row: the sheet properties with their JSON-valued columns rendered.
struct SheetRow {
    properties: SheetProperties,
    tab_color: Option<String>,
    merges: String,
}

impl TryFrom<SheetProperties> for SheetRow {
    type Error = RustyGsheetError;

    fn try_from(properties: SheetProperties) -> Result<Self, Self::Error> {
        Ok(SheetRow {
            tab_color: properties.tab_color.as_ref().map(|color| color.to_string()),
            merges: serde_json::to_string(&properties.merges)?,
            properties,
        })
    }
}

#[repr(C)]
/// Properties of every sheet in the document
pub(crate) struct GsheetSheetsBindData {
    sheets: Vec<SheetRow>,
}

impl GsheetSheetsBindData {
    fn load(spreadsheet: &str) -> Result<Self, RustyGsheetError> {
        let config = ConnectionConfig::new(spreadsheet, Vec::new())?;
        let sheets = open_spreadsheet(&config.spreadsheet)?
            .list_sheets()?
            .into_iter()
            .map(SheetRow::try_from)
            .collect::<Result<_, _>>()?;
        Ok(GsheetSheetsBindData { sheets })
    }
}

#[repr(C)]
pub(crate) struct GsheetSheetsInitData {
    index: AtomicUsize,
}

/// Table function listing the sheets of a document with their grid properties.
pub(crate) struct GsheetSheetsTableFunction;

impl VTab for GsheetSheetsTableFunction {
    type InitData = GsheetSheetsInitData;
    type BindData = GsheetSheetsBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let spreadsheet = SpreadsheetParam::read(bind, 0)?;
        let data = GsheetSheetsBindData::load(&spreadsheet).with_prefix(spreadsheet.as_str())?;
        for (name, kind) in COLUMNS {
            bind.add_result_column(name, LogicalTypeHandle::from(kind.to_logical_type_id()));
        }
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(GsheetSheetsInitData {
            index: AtomicUsize::new(0),
        })
    }

    fn func(func: &TableFunctionInfo<Self>, output: &mut DataChunkHandle) -> Result<(), Box<dyn Error>> {
        let init = func.get_init_data();
        let bind = func.get_bind_data();
        let lower = init.index.fetch_add(CHUNK_SIZE, Ordering::Relaxed);
        let upper = bind.sheets.len().min(lower + CHUNK_SIZE);
        if lower >= upper {
            output.set_len(0);
            return Ok(());
        }

        let mut vectors: Vec<_> = (0..COLUMNS.len()).map(|index| output.flat_vector(index)).collect();
        for (row, SheetRow { properties: sheet, tab_color, merges }) in bind.sheets[lower..upper].iter().enumerate() {
            let values = [
                OutputValue::Varchar(&sheet.title),
                OutputValue::BigInt(sheet.sheet_id),
                OutputValue::BigInt(sheet.index),
                OutputValue::Varchar(&sheet.sheet_type),
                OutputValue::Boolean(sheet.hidden),
                OutputValue::Boolean(sheet.right_to_left),
                OutputValue::from(tab_color.as_deref()),
                OutputValue::BigInt(sheet.grid_properties.row_count),
                OutputValue::BigInt(sheet.grid_properties.column_count),
                OutputValue::Varchar(merges),
            ];
            for (vector, value) in vectors.iter_mut().zip(values) {
                write_to_vector(vector, row, value);
            }
        }
        output.set_len(upper - lower);
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![SpreadsheetParam::kind()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOCUMENT: &str = r#"{
        "sheets": [
            {
                "properties": {"sheetId": 3, "title": "Grouped", "index": 0, "sheetType": "GRID",
                               "tabColor": {"green": 0.5}, "gridProperties": {"rowCount": 40, "columnCount": 5}},
                "merges": [{"startRowIndex": 1, "endRowIndex": 4, "startColumnIndex": 0, "endColumnIndex": 1}]
            },
            {"properties": {"sheetId": 9, "title": "RTL", "index": 1, "rightToLeft": true}}
        ]
    }"#;

    #[test]
    fn rows_render_json_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();
        let data = GsheetSheetsBindData::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(data.sheets.len(), 2);

        let grouped = &data.sheets[0];
        assert_eq!(grouped.properties.title, "Grouped");
        assert_eq!(grouped.tab_color.as_deref(), Some(r#"{"green":0.5}"#));
        assert_eq!(
            grouped.merges,
            r#"[{"startRowIndex":1,"endRowIndex":4,"startColumnIndex":0,"endColumnIndex":1}]"#
        );

        let rtl = &data.sheets[1];
        assert!(rtl.properties.right_to_left);
        assert_eq!(rtl.tab_color, None);
        assert_eq!(rtl.merges, "[]");
    }

    #[test]
    fn missing_document_is_an_error() {
        assert!(GsheetSheetsBindData::load("missing_document.json").is_err());
        assert!(GsheetSheetsBindData::load("").is_err());
    }
}
