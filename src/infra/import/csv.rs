use std::path::Path;

use csv::StringRecord;

use crate::domain::entities::row::CellValue;
use crate::infra::import::{build_rows, normalize_headers, ImportedTable, ParseError};

/// Whole-cell numbers become numeric values; everything else stays text.
pub fn csv_cell_value(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if !trimmed.is_empty() && value.is_finite() => CellValue::Number(value),
        _ => CellValue::Text(raw.to_string()),
    }
}

fn record_values(record: &StringRecord) -> Vec<CellValue> {
    record.iter().map(csv_cell_value).collect()
}

pub fn read_csv(csv_path: &Path) -> Result<ImportedTable, ParseError> {
    let path = csv_path.display().to_string();
    let csv_error = |source| ParseError::Csv {
        path: path.clone(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();

    if headers.iter().all(|name| name.trim().is_empty()) {
        return Err(ParseError::MissingHeader(path.clone()));
    }

    let column_order = normalize_headers(headers.iter());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        records.push(record_values(&record));
    }

    Ok(ImportedTable {
        rows: build_rows(&column_order, records),
        column_order,
    })
}
