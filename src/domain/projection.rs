use crate::domain::aggregate::compute_aggregates;
use crate::domain::entities::dataset::ColumnOrder;
use crate::domain::entities::row::Row;
use crate::domain::entities::view::GridRow;

/// Case-insensitive substring match against the id and every field value.
pub fn row_matches(row: &Row, needle_lowered: &str) -> bool {
    row.id.to_string().to_lowercase().contains(needle_lowered)
        || row
            .fields()
            .any(|(_, value)| value.to_string().to_lowercase().contains(needle_lowered))
}

pub fn filter_rows(rows: &[Row], search_text: &str) -> Vec<Row> {
    if search_text.trim().is_empty() {
        return rows.to_vec();
    }
    let needle = search_text.to_lowercase();
    rows.iter()
        .filter(|row| row_matches(row, &needle))
        .cloned()
        .collect()
}

/// Filters first, then totals what survived. The totals row, if any, is last.
pub fn project(rows: &[Row], columns: &ColumnOrder, search_text: &str) -> Vec<GridRow> {
    let visible = filter_rows(rows, search_text);
    let aggregates = compute_aggregates(&visible, columns);

    let mut projected: Vec<GridRow> = aggregates
        .rows
        .into_iter()
        .map(GridRow::Regular)
        .collect();
    if let Some(totals) = aggregates.totals {
        projected.push(GridRow::Totals(totals));
    }
    projected
}
