use std::collections::BTreeSet;

use crate::domain::entities::row::{CellValue, RowId};
use crate::domain::entities::view::GridKey;

#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub key: GridKey,
    pub field: String,
    pub value: CellValue,
}

impl CellEdit {
    pub fn new(key: impl Into<GridKey>, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Rows ticked in the grid. Only real rows can be selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<RowId>,
}

impl Selection {
    pub fn select(&mut self, key: GridKey) -> bool {
        match key.row_id() {
            Some(id) => self.ids.insert(id),
            None => false,
        }
    }

    pub fn deselect(&mut self, key: GridKey) -> bool {
        match key.row_id() {
            Some(id) => self.ids.remove(&id),
            None => false,
        }
    }

    pub fn toggle(&mut self, key: GridKey) {
        if let Some(id) = key.row_id() {
            if !self.ids.remove(&id) {
                self.ids.insert(id);
            }
        }
    }

    pub fn replace<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = GridKey>,
    {
        self.ids = keys.into_iter().filter_map(GridKey::row_id).collect();
    }

    pub fn retain(&mut self, mut keep: impl FnMut(RowId) -> bool) {
        self.ids.retain(|id| keep(*id));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &BTreeSet<RowId> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
