use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::domain::entities::row::CellValue;
use crate::infra::import::{build_rows, normalize_headers, ImportedTable, ParseError};

pub fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(v) => CellValue::Text(v.to_string()),
        Data::Float(v) => CellValue::Number(*v),
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::Bool(v) => CellValue::Text(v.to_string()),
        Data::DateTime(v) => CellValue::Text(v.to_string()),
        Data::DateTimeIso(v) => CellValue::Text(v.to_string()),
        Data::DurationIso(v) => CellValue::Text(v.to_string()),
        Data::Error(v) => CellValue::Text(format!("{v:?}")),
        Data::Empty => CellValue::empty(),
    }
}

/// Reads the first worksheet: header row, then data rows.
pub fn read_first_sheet(xlsx_path: &Path) -> Result<ImportedTable, ParseError> {
    let path = xlsx_path.display().to_string();
    let mut workbook = open_workbook_auto(xlsx_path).map_err(|source| ParseError::Workbook {
        path: path.clone(),
        source,
    })?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(ParseError::MissingHeader(path));
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|source| ParseError::Workbook {
            path: path.clone(),
            source,
        })?;

    let mut rows = range
        .rows()
        .skip_while(|row| row.iter().all(|cell| matches!(cell, Data::Empty)));
    let Some(header_row) = rows.next() else {
        return Err(ParseError::MissingHeader(path));
    };
    let column_order = normalize_headers(
        header_row
            .iter()
            .map(|cell| cell_to_value(cell).to_string()),
    );

    let records = rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    Ok(ImportedTable {
        rows: build_rows(&column_order, records),
        column_order,
    })
}
