use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Record, Table, Value};
use crate::error::DataLoadError;

// ---------------------------------------------------------------------------
// Table specification
// ---------------------------------------------------------------------------

/// Type coercion applied to every cell of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    /// Integer if it parses, then float, otherwise text.
    Infer,
}

impl ColumnType {
    fn label(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "number",
            ColumnType::Infer => "value",
        }
    }
}

/// Where column names come from.
#[derive(Debug, Clone)]
pub enum Columns {
    /// Explicit ordered names; any header row in the file is ignored.
    Declared(Vec<(String, ColumnType)>),
    /// Names taken from the header row; hints override `Infer` per name.
    FromHeader(BTreeMap<String, ColumnType>),
}

/// Everything the loader needs to know about one dataset.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub columns: Columns,
    /// Whether the first line is a header row (skipped for `Declared`).
    pub has_header: bool,
}

impl TableSpec {
    /// A table layout with explicit column names overriding the file's header row.
    pub fn declared<S: AsRef<str>>(name: &str, columns: &[(S, ColumnType)]) -> Self {
        TableSpec {
            name: name.to_string(),
            columns: Columns::Declared(
                columns
                    .iter()
                    .map(|(c, t)| (c.as_ref().to_string(), *t))
                    .collect(),
            ),
            has_header: true,
        }
    }

    /// A table layout whose column names come from the header row.
    pub fn from_header(name: &str) -> Self {
        TableSpec {
            name: name.to_string(),
            columns: Columns::FromHeader(BTreeMap::new()),
            has_header: true,
        }
    }

    /// Add a type hint. For declared columns the hint replaces the declared
    /// type of that column.
    pub fn hint(mut self, column: &str, ty: ColumnType) -> Self {
        match &mut self.columns {
            Columns::FromHeader(hints) => {
                hints.insert(column.to_string(), ty);
            }
            Columns::Declared(cols) => {
                if let Some(slot) = cols.iter_mut().find(|(c, _)| c == column) {
                    slot.1 = ty;
                }
            }
        }
        self
    }

    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – columns looked up by their declared names
/// * anything else      – comma-delimited text
pub fn load_path(path: &Path, spec: &TableSpec) -> Result<Table, DataLoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let io_err = |source| DataLoadError::Io {
        dataset: spec.name.clone(),
        path: path.to_path_buf(),
        source,
    };

    let table = match ext.as_str() {
        "parquet" | "pq" => {
            let file = std::fs::File::open(path).map_err(io_err)?;
            load_parquet(file, spec)?
        }
        _ => {
            let file = std::fs::File::open(path).map_err(io_err)?;
            load_reader(file, spec)?
        }
    };

    log::info!(
        "Loaded {} rows of '{}' from {}",
        table.len(),
        table.name,
        path.display()
    );
    Ok(table)
}

/// Parse CSV text that has already been fetched (remote datasets).
pub fn load_text(text: &str, spec: &TableSpec) -> Result<Table, DataLoadError> {
    load_reader(text.as_bytes(), spec)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_reader<R: Read>(input: R, spec: &TableSpec) -> Result<Table, DataLoadError> {
    let csv_err = |source| DataLoadError::Csv {
        dataset: spec.name.clone(),
        source,
    };

    // Field counts are checked against the declared columns below, so the
    // reader itself must not reject ragged rows.
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(spec.has_header)
        .flexible(true)
        .from_reader(input);

    let columns: Vec<(String, ColumnType)> = match &spec.columns {
        Columns::Declared(cols) => cols.clone(),
        Columns::FromHeader(hints) => reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| {
                let name = h.trim().to_string();
                let ty = hints.get(&name).copied().unwrap_or(ColumnType::Infer);
                (name, ty)
            })
            .collect(),
    };

    let mut records = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let raw = result.map_err(csv_err)?;

        if raw.len() != columns.len() {
            return Err(DataLoadError::FieldCount {
                dataset: spec.name.clone(),
                row,
                expected: columns.len(),
                found: raw.len(),
            });
        }

        let mut fields = Vec::with_capacity(columns.len());
        for ((name, ty), cell) in columns.iter().zip(raw.iter()) {
            let value = parse_cell(cell, *ty).ok_or_else(|| DataLoadError::BadValue {
                dataset: spec.name.clone(),
                row,
                column: name.clone(),
                value: cell.to_string(),
                expected: ty.label(),
            })?;
            fields.push((name.clone(), value));
        }
        records.push(fields.into_iter().collect::<Record>());
    }

    Ok(Table::new(
        spec.name.clone(),
        columns.into_iter().map(|(c, _)| c).collect(),
        records,
    ))
}

/// Coerce one raw cell. Empty cells are null regardless of type.
fn parse_cell(s: &str, ty: ColumnType) -> Option<Value> {
    let t = s.trim();
    if t.is_empty() {
        return Some(Value::Null);
    }
    match ty {
        ColumnType::Text => Some(Value::Text(t.to_string())),
        ColumnType::Integer => t.parse().ok().map(Value::Integer),
        ColumnType::Float => t.parse().ok().map(Value::Float),
        ColumnType::Infer => Some(guess_type(t)),
    }
}

fn guess_type(s: &str) -> Value {
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file. Declared columns are looked up by name in the file
/// schema and coerced to their declared type; header-driven specs take every
/// column the file has.
fn load_parquet(file: std::fs::File, spec: &TableSpec) -> Result<Table, DataLoadError> {
    let pq_err = |e: &dyn std::fmt::Display| DataLoadError::Parquet {
        dataset: spec.name.clone(),
        reason: e.to_string(),
    };

    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| pq_err(&e))?;
    let file_columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let columns: Vec<(String, ColumnType)> = match &spec.columns {
        Columns::Declared(cols) => cols.clone(),
        Columns::FromHeader(hints) => file_columns
            .iter()
            .map(|c| (c.clone(), hints.get(c).copied().unwrap_or(ColumnType::Infer)))
            .collect(),
    };

    for (name, _) in &columns {
        if !file_columns.contains(name) {
            return Err(DataLoadError::MissingColumn {
                dataset: spec.name.clone(),
                column: name.clone(),
            });
        }
    }

    let reader = builder.build().map_err(|e| pq_err(&e))?;
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|e| pq_err(&e))?;
        let schema = batch.schema();

        let mut arrays = Vec::with_capacity(columns.len());
        for (name, ty) in &columns {
            let idx = schema.index_of(name).map_err(|e| pq_err(&e))?;
            arrays.push((name, *ty, batch.column(idx)));
        }

        for row in 0..batch.num_rows() {
            let mut fields = Vec::with_capacity(arrays.len());
            for (name, ty, array) in &arrays {
                let raw = extract_value(array, row).map_err(|e| pq_err(&e))?;
                let value = coerce(raw, *ty).ok_or_else(|| DataLoadError::BadValue {
                    dataset: spec.name.clone(),
                    row: records.len() + 1,
                    column: (*name).clone(),
                    value: format!("{:?}", array.data_type()),
                    expected: ty.label(),
                })?;
                fields.push(((*name).clone(), value));
            }
            records.push(fields.into_iter().collect::<Record>());
        }
    }

    Ok(Table::new(
        spec.name.clone(),
        columns.into_iter().map(|(c, _)| c).collect(),
        records,
    ))
}

/// Extract a single value from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<Value, String> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| Value::Text(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| Value::Text(a.value(row).to_string())),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| Value::Integer(i64::from(a.value(row)))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| Value::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| Value::Float(f64::from(a.value(row)))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| Value::Float(a.value(row))),
        other => return Err(format!("unsupported column type {other:?}")),
    };
    value.ok_or_else(|| format!("column does not match its declared type {:?}", col.data_type()))
}

fn coerce(value: Value, ty: ColumnType) -> Option<Value> {
    match (ty, value) {
        (_, Value::Null) => Some(Value::Null),
        (ColumnType::Infer, v) => Some(v),
        (ColumnType::Text, Value::Text(s)) => Some(Value::Text(s)),
        (ColumnType::Text, v) => Some(Value::Text(v.to_string())),
        (ColumnType::Integer, v) => v.as_i64().map(Value::Integer),
        (ColumnType::Float, Value::Text(s)) => s.trim().parse().ok().map(Value::Float),
        (ColumnType::Float, v) => v.as_f64().map(Value::Float),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sales_spec() -> TableSpec {
        TableSpec::declared(
            "sales",
            &[
                ("Country", ColumnType::Text),
                ("Code", ColumnType::Text),
                ("Year", ColumnType::Integer),
                ("NumCig", ColumnType::Float),
            ],
        )
    }

    #[test]
    fn declared_columns_override_the_header_row() {
        let text = "Entity,Code,Year,Sales\nFrance,FRA,1980,6\nSpain,ESP,1980,5.5\n";
        let t = load_text(text, &sales_spec()).unwrap();
        assert_eq!(t.columns, vec!["Country", "Code", "Year", "NumCig"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.records[0].text("Country"), Some("France"));
        assert_eq!(t.records[0].value("Year"), &Value::Integer(1980));
        assert_eq!(t.records[1].value("NumCig"), &Value::Float(5.5));
    }

    #[test]
    fn empty_cells_become_null() {
        let text = "a,b,c,d\nFrance,,1980,\n";
        let t = load_text(text, &sales_spec()).unwrap();
        assert!(t.records[0].value("Code").is_null());
        assert!(t.records[0].value("NumCig").is_null());
    }

    #[test]
    fn ragged_row_is_a_field_count_error() {
        let text = "a,b,c,d\nFrance,FRA,1980,6\nSpain,ESP,1980\n";
        match load_text(text, &sales_spec()) {
            Err(DataLoadError::FieldCount {
                dataset,
                row,
                expected,
                found,
            }) => {
                assert_eq!(dataset, "sales");
                assert_eq!((row, expected, found), (2, 4, 3));
            }
            other => panic!("expected FieldCount, got {other:?}"),
        }
    }

    #[test]
    fn bad_integer_is_reported_with_its_column() {
        let text = "a,b,c,d\nFrance,FRA,nineteen,6\n";
        let err = load_text(text, &sales_spec()).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::BadValue { ref column, row: 1, .. } if column == "Year"
        ));
        assert_eq!(err.dataset(), "sales");
    }

    #[test]
    fn header_driven_spec_infers_types_and_applies_hints() {
        let text = "Country,Year,Monitor,ID\nFrance,2008,3,France2008\n";
        let spec = TableSpec::from_header("control").hint("Monitor", ColumnType::Float);
        let t = load_text(text, &spec).unwrap();
        assert_eq!(t.columns, vec!["Country", "Year", "Monitor", "ID"]);
        assert_eq!(t.records[0].value("Year"), &Value::Integer(2008));
        assert_eq!(t.records[0].value("Monitor"), &Value::Float(3.0));
        assert_eq!(t.records[0].text("ID"), Some("France2008"));
    }

    #[test]
    fn headerless_file_keeps_its_first_row() {
        let text = "France,FRA,1980,6\n";
        let t = load_text(text, &sales_spec().without_header()).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.records[0].text("Code"), Some("FRA"));
    }

    #[test]
    fn missing_file_is_an_io_error_naming_the_dataset() {
        let err = load_path(Path::new("/definitely/not/here.csv"), &sales_spec()).unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
        assert!(err.to_string().starts_with("sales:"));
    }

    #[test]
    fn load_path_reads_rows_in_file_order() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "h1,h2,h3,h4").unwrap();
        writeln!(file, "Spain,ESP,1990,4").unwrap();
        writeln!(file, "France,FRA,1980,6").unwrap();
        let t = load_path(file.path(), &sales_spec()).unwrap();
        let countries: Vec<_> = t.records.iter().filter_map(|r| r.text("Country")).collect();
        assert_eq!(countries, vec!["Spain", "France"]);
    }
}
