use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign key enforcement")?;
    Ok(conn)
}

pub fn init_db(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }

    let conn = open_connection(db_path)?;

    // `cell.value` has no declared type so numbers and text keep their own
    // storage class.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS dataset (
            kind        TEXT PRIMARY KEY,
            row_count   INTEGER NOT NULL,
            id_high_water INTEGER NOT NULL DEFAULT 0,
            saved_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS column_name (
            kind        TEXT NOT NULL,
            col_idx     INTEGER NOT NULL,
            name        TEXT NOT NULL,
            PRIMARY KEY (kind, col_idx),
            FOREIGN KEY (kind) REFERENCES dataset(kind)
        );

        CREATE TABLE IF NOT EXISTS row_entry (
            kind        TEXT NOT NULL,
            position    INTEGER NOT NULL,
            row_id      INTEGER NOT NULL,
            PRIMARY KEY (kind, row_id),
            FOREIGN KEY (kind) REFERENCES dataset(kind)
        );

        CREATE TABLE IF NOT EXISTS cell (
            kind        TEXT NOT NULL,
            row_id      INTEGER NOT NULL,
            field_idx   INTEGER NOT NULL,
            name        TEXT NOT NULL,
            value,
            PRIMARY KEY (kind, row_id, field_idx),
            FOREIGN KEY (kind, row_id) REFERENCES row_entry(kind, row_id)
        );

        CREATE INDEX IF NOT EXISTS idx_row_entry_position
            ON row_entry(kind, position);
        ",
    )
    .context("failed to initialize schema")?;

    Ok(())
}
