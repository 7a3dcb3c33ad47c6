use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::DatasetError;
use crate::table::Table;

/// Loads a comma-separated file with a header row.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Table, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::io("opening dataset", path, source))?;
    read_csv(file, path)
}

/// Parses CSV from any reader; `source` is only used for error context.
pub fn read_csv<R: Read>(reader: R, source: &Path) -> Result<Table, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|error| DatasetError::csv(source, error))?
        .clone();

    if headers.is_empty() {
        return Err(DatasetError::Empty {
            path: source.to_path_buf(),
        });
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|error| DatasetError::csv(source, error))?;
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let raw = headers
        .iter()
        .map(str::to_string)
        .zip(cells)
        .collect();

    Ok(Table::from_raw_columns(raw))
}
