use std::fmt;

use serde_json::{Map, Value};

use crate::domain::entities::row::{
    number_to_json, Row, RowId, ID_FIELD, ROW_TOTAL_FIELD, TOTALS_ROW_ID,
};

/// Identifier the grid hands back for a rendered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridKey {
    Row(RowId),
    Totals,
}

impl GridKey {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == TOTALS_ROW_ID {
            return Some(GridKey::Totals);
        }
        raw.parse::<i64>().ok().map(|id| GridKey::Row(RowId(id)))
    }

    pub fn row_id(self) -> Option<RowId> {
        match self {
            GridKey::Row(id) => Some(id),
            GridKey::Totals => None,
        }
    }
}

impl From<RowId> for GridKey {
    fn from(value: RowId) -> Self {
        GridKey::Row(value)
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridKey::Row(id) => write!(f, "{id}"),
            GridKey::Totals => f.write_str(TOTALS_ROW_ID),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnTotal {
    Sum(f64),
    /// Non-numeric column; renders as empty text.
    Blank,
}

impl ColumnTotal {
    pub fn sum(self) -> Option<f64> {
        match self {
            ColumnTotal::Sum(value) => Some(value),
            ColumnTotal::Blank => None,
        }
    }

    fn to_json(self) -> Value {
        match self {
            ColumnTotal::Sum(value) => number_to_json(value),
            ColumnTotal::Blank => Value::String(String::new()),
        }
    }
}

/// A stored row plus its derived `rowTotal`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoratedRow {
    pub row: Row,
    pub row_total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TotalsRow {
    pub columns: Vec<(String, ColumnTotal)>,
    pub row_total: f64,
}

impl TotalsRow {
    pub fn get(&self, column: &str) -> Option<ColumnTotal> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, total)| *total)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridRow {
    Regular(DecoratedRow),
    Totals(TotalsRow),
}

impl GridRow {
    pub fn key(&self) -> GridKey {
        match self {
            GridRow::Regular(decorated) => GridKey::Row(decorated.row.id),
            GridRow::Totals(_) => GridKey::Totals,
        }
    }

    pub fn row_total(&self) -> f64 {
        match self {
            GridRow::Regular(decorated) => decorated.row_total,
            GridRow::Totals(totals) => totals.row_total,
        }
    }

    pub fn is_totals(&self) -> bool {
        matches!(self, GridRow::Totals(_))
    }

    /// Flat wire shape; the totals variant is the only one carrying the
    /// `"total-row"` id.
    pub fn to_json(&self) -> Value {
        let mut map = match self {
            GridRow::Regular(decorated) => decorated.row.to_json(),
            GridRow::Totals(totals) => {
                let mut map = Map::new();
                map.insert(ID_FIELD.to_string(), Value::from(TOTALS_ROW_ID));
                for (name, total) in &totals.columns {
                    map.insert(name.clone(), total.to_json());
                }
                map
            }
        };
        map.insert(ROW_TOTAL_FIELD.to_string(), number_to_json(self.row_total()));
        Value::Object(map)
    }
}
