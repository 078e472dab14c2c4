use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::entities::row::{Row, ID_FIELD};

/// The two datasets the app manages. Both run on the same engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    #[serde(rename = "config")]
    Configuration,
    Preferences,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Configuration, DatasetKind::Preferences];

    pub fn slug(self) -> &'static str {
        match self {
            DatasetKind::Configuration => "config",
            DatasetKind::Preferences => "preferences",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Noun used in user-facing status text.
    pub fn noun(self) -> &'static str {
        match self {
            DatasetKind::Configuration => "configuration",
            DatasetKind::Preferences => "preferences",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DatasetKind::Configuration => "Configuration",
            DatasetKind::Preferences => "Preferences",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetState {
    Empty,
    Loaded,
}

/// Canonical left-to-right column sequence, never containing `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnOrder(Vec<String>);

impl ColumnOrder {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnOrder(
            columns
                .into_iter()
                .map(Into::into)
                .filter(|name: &String| name != ID_FIELD)
                .collect(),
        )
    }

    /// A declared, non-empty order wins; otherwise the first row's own key
    /// order is used.
    pub fn resolve(declared: Option<Vec<String>>, rows: &[Row]) -> Self {
        let declared = declared.map(ColumnOrder::new).unwrap_or_default();
        if !declared.is_empty() {
            return declared;
        }
        rows.first()
            .map(|row| ColumnOrder::new(row.field_names().map(str::to_string)))
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|column| column == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMeta {
    pub kind: DatasetKind,
    pub row_count: i64,
    pub column_count: i64,
    pub saved_at: Option<String>,
}
