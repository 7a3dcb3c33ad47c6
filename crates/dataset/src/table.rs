use std::collections::HashMap;
use std::fmt;

/// Cell tokens treated as missing values, in addition to blank cells.
pub const MISSING_TOKENS: [&str; 10] = [
    "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>",
];

/// Column element type, named after the equivalent dataframe dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Int64,
    Float64,
    Bool,
    Object,
}

impl DType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Object => "object",
        }
    }

    /// Returns true for dtypes summarized with numeric statistics.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("NaN"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: DType,
    values: Vec<Value>,
}

impl Column {
    /// Builds a column from raw cells, inferring the narrowest dtype that fits every cell.
    #[must_use]
    pub fn infer(name: impl Into<String>, cells: Vec<String>) -> Self {
        let dtype = infer_dtype(&cells);
        let values = cells
            .into_iter()
            .map(|cell| parse_cell(cell, dtype))
            .collect();

        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Non-missing numeric values in row order.
    #[must_use]
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(Value::as_f64).collect()
    }

    #[must_use]
    pub fn non_missing_count(&self) -> usize {
        self.values.iter().filter(|value| !value.is_missing()).count()
    }
}

/// In-memory tabular dataset handed to the agent as a bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Builds a table from named raw cell columns. Blank names become `Unnamed: <index>`
    /// and repeated names receive a `.<n>` suffix.
    #[must_use]
    pub fn from_raw_columns(raw: Vec<(String, Vec<String>)>) -> Self {
        let rows = raw.first().map_or(0, |(_, cells)| cells.len());
        let mut seen: HashMap<String, usize> = HashMap::new();

        let columns = raw
            .into_iter()
            .enumerate()
            .map(|(index, (name, cells))| {
                let name = unique_column_name(&mut seen, index, name);
                Column::infer(name, cells)
            })
            .collect();

        Self { columns, rows }
    }

    /// Returns `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    #[must_use]
    pub fn dtypes(&self) -> Vec<(&str, DType)> {
        self.columns
            .iter()
            .map(|column| (column.name(), column.dtype()))
            .collect()
    }
}

fn unique_column_name(seen: &mut HashMap<String, usize>, index: usize, name: String) -> String {
    let base = if name.trim().is_empty() {
        format!("Unnamed: {index}")
    } else {
        name
    };

    let count = seen.entry(base.clone()).or_insert(0);
    let unique = if *count == 0 {
        base
    } else {
        format!("{base}.{count}")
    };
    *count += 1;
    unique
}

fn is_missing_cell(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed)
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim() {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

fn infer_dtype(cells: &[String]) -> DType {
    let has_missing = cells.iter().any(|cell| is_missing_cell(cell));
    let mut present = cells
        .iter()
        .filter(|cell| !is_missing_cell(cell))
        .map(|cell| cell.trim())
        .peekable();

    if present.peek().is_none() {
        return DType::Float64;
    }

    let present: Vec<&str> = present.collect();

    if present.iter().all(|cell| cell.parse::<i64>().is_ok()) {
        return if has_missing {
            DType::Float64
        } else {
            DType::Int64
        };
    }

    if present.iter().all(|cell| cell.parse::<f64>().is_ok()) {
        return DType::Float64;
    }

    if !has_missing && present.iter().all(|cell| parse_bool(cell).is_some()) {
        return DType::Bool;
    }

    DType::Object
}

fn parse_cell(cell: String, dtype: DType) -> Value {
    if is_missing_cell(&cell) {
        return Value::Missing;
    }

    let trimmed = cell.trim();
    let parsed = match dtype {
        DType::Int64 => trimmed.parse().ok().map(Value::Int),
        DType::Float64 => trimmed.parse().ok().map(Value::Float),
        DType::Bool => parse_bool(trimmed).map(Value::Bool),
        DType::Object => None,
    };

    parsed.unwrap_or(Value::Text(cell))
}
