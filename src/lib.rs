pub mod config;
pub mod domain;
pub mod infra;
pub mod render;
pub mod usecase;

pub use domain::aggregate::{compute_aggregates, Aggregates, ColumnKind};
pub use domain::entities::dataset::{ColumnOrder, DatasetKind, DatasetState};
pub use domain::entities::row::{CellValue, Row, RowId, TOTALS_ROW_ID};
pub use domain::entities::view::{ColumnTotal, GridKey, GridRow, TotalsRow};
pub use domain::error::ValidationError;
pub use domain::projection::project;
pub use usecase::ports::gateway::{AckResponse, LoadResponse, PersistenceGateway, RemoteError};
pub use usecase::services::controller::{ControllerError, DatasetController};

#[cfg(test)]
mod tests;
