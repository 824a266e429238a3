use duckdb::core::LogicalTypeId;

/// Column data types exposed to DuckDB. Projected sheet cells are always VARCHAR; the
/// other types only appear in metadata tables.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum ColumnType {
    /// Boolean values (true/false)
    Boolean,
    /// 64-bit signed integers
    BigInt,
    /// Variable-length strings
    Varchar,
}

/// Represents a column in an output table with name and data type.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Column {
    /// Column name
    pub(crate) name: String,
    /// Column data type
    pub(crate) kind: ColumnType,
}

impl ColumnType {
    /// Converts column type to DuckDB's logical type ID.
    pub(crate) const fn to_logical_type_id(&self) -> LogicalTypeId {
        match self {
            Self::Boolean => LogicalTypeId::Boolean,
            Self::BigInt => LogicalTypeId::Bigint,
            Self::Varchar => LogicalTypeId::Varchar,
        }
    }
}

impl Column {
    pub(crate) fn new(name: &str, kind: ColumnType) -> Self {
        Self {
            name: name.to_owned(),
            kind,
        }
    }
}

/// Ordered, unique, non-empty column names, index-aligned with sheet column positions
/// (entry 0 is column A of the sheet).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ColumnSchema {
    names: Vec<String>,
}

impl ColumnSchema {
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|it| it == name)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    /// Table columns for DuckDB, every one typed VARCHAR.
    pub(crate) fn columns(&self) -> Vec<Column> {
        self.names
            .iter()
            .map(|name| Column::new(name, ColumnType::Varchar))
            .collect()
    }

    pub(crate) fn push(&mut self, name: String) {
        self.names.push(name);
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut String> {
        self.names.last_mut()
    }
}
