//! Row, column and grand totals. Pure over `(rows, columns)`.

use crate::domain::entities::dataset::ColumnOrder;
use crate::domain::entities::row::{Row, ROW_TOTAL_FIELD};
use crate::domain::entities::view::{ColumnTotal, DecoratedRow, TotalsRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    /// Name heuristic: anything mentioning a name or an email is text.
    pub fn classify(column: &str) -> Self {
        let lowered = column.to_lowercase();
        if lowered.contains("name") || lowered.contains("email") {
            ColumnKind::Text
        } else {
            ColumnKind::Numeric
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregates {
    pub rows: Vec<DecoratedRow>,
    /// `None` when there were no rows to total.
    pub totals: Option<TotalsRow>,
}

pub fn row_total(row: &Row) -> f64 {
    row.fields()
        .filter(|(name, _)| *name != ROW_TOTAL_FIELD)
        .filter_map(|(_, value)| value.as_number())
        .sum()
}

pub fn column_total(rows: &[Row], column: &str) -> ColumnTotal {
    match ColumnKind::classify(column) {
        ColumnKind::Text => ColumnTotal::Blank,
        ColumnKind::Numeric => ColumnTotal::Sum(
            rows.iter()
                .filter_map(|row| row.get(column).and_then(|value| value.as_number()))
                .sum(),
        ),
    }
}

pub fn compute_aggregates(rows: &[Row], columns: &ColumnOrder) -> Aggregates {
    if rows.is_empty() {
        return Aggregates::default();
    }

    let decorated = rows
        .iter()
        .map(|row| DecoratedRow {
            row: row.clone(),
            row_total: row_total(row),
        })
        .collect();

    let column_totals: Vec<(String, ColumnTotal)> = columns
        .iter()
        .map(|column| (column.to_string(), column_total(rows, column)))
        .collect();
    let grand_total = column_totals
        .iter()
        .filter_map(|(_, total)| total.sum())
        .sum();

    log::debug!(
        "aggregated {} rows over {} columns, grand total {grand_total}",
        rows.len(),
        columns.len()
    );

    Aggregates {
        rows: decorated,
        totals: Some(TotalsRow {
            columns: column_totals,
            row_total: grand_total,
        }),
    }
}
