use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, types::Value, OptionalExtension};

use crate::domain::entities::dataset::{DatasetKind, DatasetMeta};
use crate::domain::entities::row::{CellValue, Row, RowId};
use crate::infra::sqlite::schema::{init_db, open_connection};

pub fn cell_to_sql(value: &CellValue) -> Value {
    match value {
        CellValue::Number(number) => Value::Real(*number),
        CellValue::Text(text) => Value::Text(text.clone()),
    }
}

pub fn cell_from_sql(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::empty(),
        Value::Integer(number) => CellValue::Number(number as f64),
        Value::Real(number) => CellValue::Number(number),
        Value::Text(text) => CellValue::Text(text),
        Value::Blob(bytes) => CellValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

pub fn insert_header_names(
    tx: &rusqlite::Transaction<'_>,
    kind: DatasetKind,
    headers: &[String],
) -> Result<()> {
    let mut insert_header = tx
        .prepare("INSERT INTO column_name(kind, col_idx, name) VALUES (?1, ?2, ?3)")
        .context("failed to prepare header insert")?;

    for (col_idx, name) in headers.iter().enumerate() {
        insert_header
            .execute(params![kind.slug(), col_idx as i64, name])
            .context("failed to insert header")?;
    }

    Ok(())
}

fn delete_dataset_records(tx: &rusqlite::Transaction<'_>, kind: DatasetKind) -> Result<()> {
    tx.execute("DELETE FROM cell WHERE kind = ?1", params![kind.slug()])
        .with_context(|| format!("failed to delete cells for {kind}"))?;
    tx.execute("DELETE FROM row_entry WHERE kind = ?1", params![kind.slug()])
        .with_context(|| format!("failed to delete rows for {kind}"))?;
    tx.execute(
        "DELETE FROM column_name WHERE kind = ?1",
        params![kind.slug()],
    )
    .with_context(|| format!("failed to delete columns for {kind}"))?;
    Ok(())
}

/// Every field name across `rows`, in first-seen order.
pub fn collect_headers(rows: &[Row]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        for name in row.field_names() {
            if !headers.iter().any(|header| header == name) {
                headers.push(name.to_string());
            }
        }
    }
    headers
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredDataset {
    pub column_order: Vec<String>,
    pub rows: Vec<Row>,
    /// `None` when the dataset was never saved.
    pub id_high_water: Option<i64>,
}

/// Replaces the stored rows of `kind`. The union of the rows' keys, in
/// first-seen order, becomes the stored column order.
pub fn save_rows(
    db_path: &Path,
    kind: DatasetKind,
    rows: &[Row],
    id_high_water: i64,
) -> Result<()> {
    init_db(db_path)?;
    let mut conn = open_connection(db_path)?;
    let tx = conn
        .transaction()
        .context("failed to start save transaction")?;

    let saved_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let id_high_water = rows
        .iter()
        .map(|row| row.id.0)
        .fold(id_high_water, i64::max);
    tx.execute(
        "INSERT INTO dataset(kind, row_count, id_high_water, saved_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(kind) DO UPDATE SET
             row_count = excluded.row_count,
             id_high_water = excluded.id_high_water,
             saved_at = excluded.saved_at",
        params![kind.slug(), rows.len() as i64, id_high_water, saved_at],
    )
    .with_context(|| format!("failed to upsert dataset {kind}"))?;

    delete_dataset_records(&tx, kind)?;

    insert_header_names(&tx, kind, &collect_headers(rows))?;

    let mut insert_row = tx
        .prepare("INSERT INTO row_entry(kind, position, row_id) VALUES (?1, ?2, ?3)")
        .context("failed to prepare row insert")?;
    let mut insert_cell = tx
        .prepare(
            "INSERT INTO cell(kind, row_id, field_idx, name, value) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .context("failed to prepare cell insert")?;

    for (position, row) in rows.iter().enumerate() {
        insert_row
            .execute(params![kind.slug(), position as i64, row.id.0])
            .with_context(|| format!("failed to insert row {}", row.id))?;
        for (field_idx, (name, value)) in row.fields().enumerate() {
            insert_cell
                .execute(params![
                    kind.slug(),
                    row.id.0,
                    field_idx as i64,
                    name,
                    cell_to_sql(value)
                ])
                .with_context(|| format!("failed to insert cell `{name}` of row {}", row.id))?;
        }
    }
    drop(insert_cell);
    drop(insert_row);

    tx.commit().context("failed to commit save transaction")?;
    Ok(())
}

pub fn load_rows(db_path: &Path, kind: DatasetKind) -> Result<StoredDataset> {
    init_db(db_path)?;
    let conn = open_connection(db_path)?;

    let id_high_water: Option<i64> = conn
        .query_row(
            "SELECT id_high_water FROM dataset WHERE kind = ?1",
            [kind.slug()],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to query id high-water mark of {kind}"))?;

    let mut columns_stmt = conn
        .prepare(
            "SELECT name
             FROM column_name
             WHERE kind = ?1
             ORDER BY col_idx ASC",
        )
        .context("failed to prepare columns query")?;
    let columns = columns_stmt
        .query_map([kind.slug()], |row| row.get::<_, String>(0))
        .context("failed to query columns")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect columns")?;
    drop(columns_stmt);

    let mut rows_stmt = conn
        .prepare(
            "SELECT row_id
             FROM row_entry
             WHERE kind = ?1
             ORDER BY position ASC",
        )
        .context("failed to prepare rows query")?;
    let mut rows: Vec<Row> = rows_stmt
        .query_map([kind.slug()], |row| row.get::<_, i64>(0))
        .context("failed to query rows")?
        .map(|id| id.map(|id| Row::new(RowId(id))))
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect rows")?;
    drop(rows_stmt);

    let row_pos: HashMap<i64, usize> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (row.id.0, idx))
        .collect();

    let mut cells_stmt = conn
        .prepare(
            "SELECT row_id, name, value
             FROM cell
             WHERE kind = ?1
             ORDER BY row_id ASC, field_idx ASC",
        )
        .context("failed to prepare cell hydration query")?;
    let mut cells = cells_stmt
        .query([kind.slug()])
        .context("failed to run cell hydration query")?;

    while let Some(cell) = cells.next().context("failed to read hydrated cell")? {
        let row_id: i64 = cell.get(0).context("failed to read row_id")?;
        let name: String = cell.get(1).context("failed to read field name")?;
        let value: Value = cell.get(2).context("failed to read value")?;

        if let Some(&dest) = row_pos.get(&row_id) {
            rows[dest].set(name, cell_from_sql(value));
        }
    }

    Ok(StoredDataset {
        column_order: columns,
        rows,
        id_high_water,
    })
}

pub fn clear_dataset(db_path: &Path, kind: DatasetKind) -> Result<()> {
    init_db(db_path)?;
    let mut conn = open_connection(db_path)?;
    let tx = conn
        .transaction()
        .context("failed to start clear transaction")?;
    delete_dataset_records(&tx, kind)?;
    tx.execute("DELETE FROM dataset WHERE kind = ?1", params![kind.slug()])
        .with_context(|| format!("failed to delete dataset {kind}"))?;
    tx.commit().context("failed to commit clear transaction")?;
    Ok(())
}

pub fn list_datasets(db_path: &Path) -> Result<Vec<DatasetMeta>> {
    init_db(db_path)?;
    let conn = open_connection(db_path)?;

    let mut datasets = Vec::new();
    for kind in DatasetKind::ALL {
        let stored: Option<(i64, String)> = conn
            .query_row(
                "SELECT row_count, saved_at FROM dataset WHERE kind = ?1",
                [kind.slug()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .with_context(|| format!("failed to query dataset {kind}"))?;
        let column_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM column_name WHERE kind = ?1",
                [kind.slug()],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to count columns of {kind}"))?;

        let (row_count, saved_at) = match stored {
            Some((row_count, saved_at)) => (row_count, Some(saved_at)),
            None => (0, None),
        };
        datasets.push(DatasetMeta {
            kind,
            row_count,
            column_count,
            saved_at,
        });
    }

    Ok(datasets)
}
