use std::path::{Path, PathBuf};

use crate::domain::entities::dataset::{DatasetKind, DatasetMeta};
use crate::domain::entities::row::{Row, RowId};
use crate::infra::import::read_table;
use crate::infra::sqlite::queries::{clear_dataset, list_datasets, load_rows, save_rows};
use crate::infra::sqlite::schema::init_db;
use crate::usecase::ports::gateway::{AckResponse, LoadResponse, PersistenceGateway, RemoteError};

fn unavailable(err: anyhow::Error) -> RemoteError {
    RemoteError::Unavailable(format!("{err:#}"))
}

/// Local SQLite file standing in for the remote store.
pub struct SqliteGateway {
    pub db_path: PathBuf,
}

impl SqliteGateway {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn init(&self) -> Result<(), RemoteError> {
        init_db(&self.db_path).map_err(unavailable)
    }

    pub fn list_datasets(&self) -> Result<Vec<DatasetMeta>, RemoteError> {
        list_datasets(&self.db_path).map_err(unavailable)
    }
}

impl PersistenceGateway for SqliteGateway {
    /// Parses the upload without storing it; the caller saves once reviewed.
    fn import(&self, kind: DatasetKind, file: &Path) -> Result<LoadResponse, RemoteError> {
        match read_table(file) {
            Ok(table) => Ok(LoadResponse::loaded(table.rows, table.column_order)),
            Err(err) => {
                log::warn!("{kind}: import of {} failed: {err}", file.display());
                let message = match std::error::Error::source(&err) {
                    Some(source) => format!("{err}: {source}"),
                    None => err.to_string(),
                };
                Ok(LoadResponse::failed(message))
            }
        }
    }

    fn load(&self, kind: DatasetKind) -> Result<LoadResponse, RemoteError> {
        let stored = load_rows(&self.db_path, kind).map_err(unavailable)?;
        log::debug!(
            "{kind}: loaded {} rows from {}",
            stored.rows.len(),
            self.db_path.display()
        );
        let response = LoadResponse::loaded(stored.rows, stored.column_order);
        Ok(match stored.id_high_water {
            Some(mark) => response.with_id_high_water(RowId(mark)),
            None => response,
        })
    }

    fn save(
        &self,
        kind: DatasetKind,
        rows: &[Row],
        id_high_water: RowId,
    ) -> Result<AckResponse, RemoteError> {
        save_rows(&self.db_path, kind, rows, id_high_water.0).map_err(unavailable)?;
        Ok(AckResponse::ok(format!(
            "{} saved successfully.",
            kind.title()
        )))
    }

    fn clear(&self, kind: DatasetKind) -> Result<AckResponse, RemoteError> {
        clear_dataset(&self.db_path, kind).map_err(unavailable)?;
        Ok(AckResponse::ok(format!(
            "{} data cleared successfully.",
            kind.title()
        )))
    }
}
