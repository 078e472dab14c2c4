use serde_json::Value;

use crate::domain::entities::dataset::ColumnOrder;
use crate::domain::entities::row::{ID_FIELD, ROW_TOTAL_FIELD};
use crate::domain::entities::view::GridRow;

fn json_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Plain-text grid: `id`, the dataset columns, then `rowTotal`.
pub fn render_table(columns: &ColumnOrder, view: &[GridRow]) -> String {
    let mut header = vec![ID_FIELD.to_string()];
    header.extend(columns.iter().map(str::to_string));
    header.push(ROW_TOTAL_FIELD.to_string());

    let mut lines: Vec<Vec<String>> = vec![header.clone()];
    for grid_row in view {
        let json = grid_row.to_json();
        lines.push(header.iter().map(|name| json_cell(json.get(name))).collect());
    }

    let widths: Vec<usize> = (0..header.len())
        .map(|col_idx| {
            lines
                .iter()
                .map(|line| line[col_idx].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for line in &lines {
        let cells: Vec<String> = line
            .iter()
            .zip(widths.iter().copied())
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}
