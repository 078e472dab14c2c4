use thiserror::Error;

use crate::domain::entities::row::RowId;

/// Rejected row-level operations. The store is left untouched whenever one
/// of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("row {0} not found")]
    RowNotFound(RowId),
    #[error("the total-row is derived and cannot be changed")]
    ReservedRow,
    #[error("field `{0}` cannot be edited")]
    ReservedField(String),
    #[error("column `{0}` is not part of this dataset")]
    UnknownColumn(String),
    #[error("duplicate row id {0}")]
    DuplicateRowId(RowId),
    #[error("row is missing an `id`")]
    MissingRowId,
    #[error("row id must be an integer, got {0}")]
    InvalidRowId(String),
    #[error("no row id left after {0}")]
    IdSpaceExhausted(RowId),
}
