pub mod csv;
pub mod xlsx;

use std::path::Path;

use thiserror::Error;

use crate::domain::entities::row::{CellValue, Row, RowId};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported file type `{0}`; accepted formats: .xlsx, .xls, .xlsm, .xlsb, .ods, .csv")]
    UnsupportedFormat(String),
    #[error("{0} has no header row")]
    MissingHeader(String),
    #[error("failed to read csv {path}")]
    Csv {
        path: String,
        #[source]
        source: ::csv::Error,
    },
    #[error("failed to read workbook {path}")]
    Workbook {
        path: String,
        #[source]
        source: calamine::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Workbook,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(SourceFormat::Workbook),
            _ => Err(ParseError::UnsupportedFormat(extension)),
        }
    }
}

/// Parsed upload: rows numbered from 1 in file order, plus the header order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportedTable {
    pub column_order: Vec<String>,
    pub rows: Vec<Row>,
}

pub fn read_table(path: &Path) -> Result<ImportedTable, ParseError> {
    let table = match SourceFormat::from_path(path)? {
        SourceFormat::Csv => csv::read_csv(path)?,
        SourceFormat::Workbook => xlsx::read_first_sheet(path)?,
    };
    log::info!(
        "parsed {} rows x {} columns from {}",
        table.rows.len(),
        table.column_order.len(),
        path.display()
    );
    Ok(table)
}

pub(crate) fn normalize_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut headers: Vec<String> = Vec::new();
    for (col_idx, name) in raw.into_iter().enumerate() {
        let name = name.as_ref().trim();
        let base = if name.is_empty() {
            format!("Column {}", col_idx + 1)
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while candidate == "id" || headers.contains(&candidate) {
            candidate = format!("{base} ({suffix})");
            suffix += 1;
        }
        headers.push(candidate);
    }
    headers
}

pub(crate) fn build_rows(headers: &[String], records: Vec<Vec<CellValue>>) -> Vec<Row> {
    records
        .into_iter()
        .filter(|record| record.iter().any(|value| !value.to_string().trim().is_empty()))
        .enumerate()
        .map(|(row_idx, mut record)| {
            record.resize(headers.len(), CellValue::empty());
            let mut row = Row::new(RowId(row_idx as i64 + 1));
            for (name, value) in headers.iter().zip(record) {
                row.set(name.clone(), value);
            }
            row
        })
        .collect()
}
