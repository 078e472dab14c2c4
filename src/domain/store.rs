use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::domain::entities::dataset::ColumnOrder;
use crate::domain::entities::row::{CellValue, Row, RowId};
use crate::domain::error::ValidationError;

/// Immutable view of the store at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub rows: Arc<Vec<Row>>,
    pub columns: Arc<ColumnOrder>,
}

/// Canonical rows plus column order. Every write builds a complete new
/// sequence and swaps it in, so readers only ever see whole snapshots.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Arc<Vec<Row>>,
    columns: Arc<ColumnOrder>,
    // Highest id held since the last replace; deleted ids stay retired.
    high_water: i64,
}

impl RowStore {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            rows: Arc::clone(&self.rows),
            columns: Arc::clone(&self.columns),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &ColumnOrder {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.find(id).is_some()
    }

    pub fn replace(
        &mut self,
        rows: Vec<Row>,
        declared_columns: Option<Vec<String>>,
    ) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.id) {
                return Err(ValidationError::DuplicateRowId(row.id));
            }
        }

        let columns = ColumnOrder::resolve(declared_columns, &rows);
        self.high_water = max_id(&rows);
        self.rows = Arc::new(rows);
        self.columns = Arc::new(columns);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.rows = Arc::new(Vec::new());
        self.columns = Arc::new(ColumnOrder::default());
        self.high_water = 0;
    }

    /// Swaps in `next` for the row sharing its id.
    pub fn replace_row(&mut self, next: Row) -> Result<(), ValidationError> {
        let position = self
            .rows
            .iter()
            .position(|row| row.id == next.id)
            .ok_or(ValidationError::RowNotFound(next.id))?;

        let mut rows = Vec::clone(&self.rows);
        rows[position] = next;
        self.rows = Arc::new(rows);
        Ok(())
    }

    pub fn set_cell(
        &mut self,
        id: RowId,
        field: &str,
        value: CellValue,
    ) -> Result<(), ValidationError> {
        let current = self.find(id).ok_or(ValidationError::RowNotFound(id))?;
        if !current.contains(field) && !self.columns.contains(field) {
            return Err(ValidationError::UnknownColumn(field.to_string()));
        }

        let mut next = current.clone();
        next.set(field.to_string(), value);
        self.replace_row(next)
    }

    pub fn high_water(&self) -> i64 {
        self.high_water.max(max_id(&self.rows))
    }

    /// Retires every id up to `id`. Never lowers the mark.
    pub fn raise_high_water(&mut self, id: i64) {
        self.high_water = self.high_water.max(id);
    }

    /// One past the largest id ever held since the last replace. Gaps are
    /// never filled and deleted ids are not handed out again.
    pub fn next_id(&self) -> Result<RowId, ValidationError> {
        let last = self.high_water();
        last.checked_add(1)
            .map(RowId)
            .ok_or(ValidationError::IdSpaceExhausted(RowId(last)))
    }

    /// Blank copy of the first row's fields with a fresh id. `Ok(None)` when
    /// there is no row to copy.
    pub fn draft_row(&self) -> Result<Option<Row>, ValidationError> {
        let Some(template) = self.rows.first() else {
            return Ok(None);
        };
        let mut draft = Row::new(self.next_id()?);
        for name in template.field_names() {
            draft.set(name.to_string(), CellValue::empty());
        }
        Ok(Some(draft))
    }

    pub fn append(&mut self, row: Row) -> Result<(), ValidationError> {
        if self.contains(row.id) {
            return Err(ValidationError::DuplicateRowId(row.id));
        }
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.extend(self.rows.iter().cloned());
        self.high_water = self.high_water.max(row.id.0);
        rows.push(row);
        self.rows = Arc::new(rows);
        Ok(())
    }

    /// Returns how many rows were dropped.
    pub fn remove(&mut self, ids: &BTreeSet<RowId>) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| !ids.contains(&row.id))
            .cloned()
            .collect();
        let removed = self.rows.len() - rows.len();
        if removed > 0 {
            self.rows = Arc::new(rows);
        }
        removed
    }
}

fn max_id(rows: &[Row]) -> i64 {
    rows.iter().map(|row| row.id.0).max().unwrap_or(0)
}
