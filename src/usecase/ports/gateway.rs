use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entities::dataset::DatasetKind;
use crate::domain::entities::row::{Row, RowId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The collaborator answered with `success: false`.
    #[error("{0}")]
    Rejected(String),
    /// The call itself failed (store unreachable, I/O, ...).
    #[error("{0}")]
    Unavailable(String),
}

/// Answer to `import` and `load`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default)]
    pub column_order: Vec<String>,
    /// Largest id the dataset has ever held, deleted rows included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_high_water: Option<RowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadResponse {
    pub fn loaded(data: Vec<Row>, column_order: Vec<String>) -> Self {
        Self {
            success: true,
            data,
            column_order,
            id_high_water: None,
            error: None,
        }
    }

    pub fn with_id_high_water(mut self, mark: RowId) -> Self {
        self.id_high_water = Some(mark);
        self
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn into_result(self) -> Result<Self, RemoteError> {
        if self.success {
            Ok(self)
        } else {
            Err(RemoteError::Rejected(self.error.unwrap_or_default()))
        }
    }
}

/// Answer to `save` and `clear`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn into_result(self) -> Result<Self, RemoteError> {
        if self.success {
            Ok(self)
        } else {
            Err(RemoteError::Rejected(self.error.unwrap_or_default()))
        }
    }
}

/// Remote store the controller loads from and saves to.
///
/// `Err` means the call could not be made at all; a reachable store that
/// refuses answers `Ok` with `success: false`.
pub trait PersistenceGateway: Send + Sync {
    fn import(&self, kind: DatasetKind, file: &Path) -> Result<LoadResponse, RemoteError>;
    fn load(&self, kind: DatasetKind) -> Result<LoadResponse, RemoteError>;
    /// `rows` never contains the totals row. `id_high_water` is the largest
    /// id handed out so far, kept so deleted ids are not reused later.
    fn save(
        &self,
        kind: DatasetKind,
        rows: &[Row],
        id_high_water: RowId,
    ) -> Result<AckResponse, RemoteError>;
    fn clear(&self, kind: DatasetKind) -> Result<AckResponse, RemoteError>;
}
