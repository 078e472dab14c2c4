use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

use crate::domain::entities::dataset::{ColumnOrder, DatasetKind, DatasetState};
use crate::domain::entities::edit::{CellEdit, Selection};
use crate::domain::entities::row::{CellValue, Row, RowId, ID_FIELD};
use crate::domain::entities::view::{GridKey, GridRow};
use crate::domain::error::ValidationError;
use crate::domain::projection::project;
use crate::domain::store::{RowStore, Snapshot};
use crate::usecase::ports::gateway::{AckResponse, LoadResponse, PersistenceGateway, RemoteError};
use crate::usecase::services::requests::{Applied, RequestKind, RequestTicket, RequestTracker};
use crate::usecase::services::status::StatusMessage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Sole writer of one dataset's row store.
///
/// Row-level operations are synchronous and all-or-nothing. Gateway calls
/// are bracketed by [`DatasetController::begin_request`] and one of the
/// `finish_*` methods, which drop responses from superseded requests.
#[derive(Debug, Clone)]
pub struct DatasetController {
    kind: DatasetKind,
    store: RowStore,
    selection: Selection,
    search_text: String,
    requests: RequestTracker,
    status: Option<StatusMessage>,
}

impl DatasetController {
    pub fn new(kind: DatasetKind) -> Self {
        Self {
            kind,
            store: RowStore::default(),
            selection: Selection::default(),
            search_text: String::new(),
            requests: RequestTracker::default(),
            status: None,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn state(&self) -> DatasetState {
        if self.store.is_empty() {
            DatasetState::Empty
        } else {
            DatasetState::Loaded
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn rows(&self) -> &[Row] {
        self.store.rows()
    }

    pub fn columns(&self) -> &ColumnOrder {
        self.store.columns()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Filtered rows with their totals, then the totals row.
    pub fn view(&self) -> Vec<GridRow> {
        project(self.store.rows(), self.store.columns(), &self.search_text)
    }

    /// Rows handed to the gateway on save. Derived rows cannot appear here.
    pub fn save_payload(&self) -> Vec<Row> {
        self.store.rows().to_vec()
    }

    pub fn import_replace(
        &mut self,
        rows: Vec<Row>,
        column_order: Option<Vec<String>>,
    ) -> Result<(), ValidationError> {
        let count = rows.len();
        if let Err(err) = self.store.replace(rows, column_order) {
            self.reject(&err);
            return Err(err);
        }
        self.selection.clear();
        log::info!("{}: store replaced with {count} rows", self.kind);
        Ok(())
    }

    pub fn edit_cell(
        &mut self,
        key: GridKey,
        field: &str,
        value: impl Into<CellValue>,
    ) -> Result<(), ValidationError> {
        let result = self.try_edit_cell(key, field, value.into());
        match &result {
            Ok(()) => self.status = Some(StatusMessage::success("Cell updated successfully.")),
            Err(err) => self.reject(err),
        }
        result
    }

    pub fn apply_edit(&mut self, edit: CellEdit) -> Result<(), ValidationError> {
        self.edit_cell(edit.key, &edit.field, edit.value)
    }

    fn try_edit_cell(
        &mut self,
        key: GridKey,
        field: &str,
        value: CellValue,
    ) -> Result<(), ValidationError> {
        let id = key.row_id().ok_or(ValidationError::ReservedRow)?;
        if field == ID_FIELD {
            return Err(ValidationError::ReservedField(field.to_string()));
        }
        self.store.set_cell(id, field, value)?;
        log::debug!("{}: row {id} field `{field}` updated", self.kind);
        Ok(())
    }

    /// Whole-row edit. Fields absent from `row` keep their current values.
    pub fn replace_row(&mut self, row: Row) -> Result<(), ValidationError> {
        let result = self.try_replace_row(row);
        match &result {
            Ok(()) => self.status = Some(StatusMessage::success("Row updated successfully.")),
            Err(err) => self.reject(err),
        }
        result
    }

    fn try_replace_row(&mut self, row: Row) -> Result<(), ValidationError> {
        let current = self
            .store
            .find(row.id)
            .ok_or(ValidationError::RowNotFound(row.id))?;
        let mut next = current.clone();
        for (name, value) in row.fields() {
            if !current.contains(name) && !self.store.columns().contains(name) {
                return Err(ValidationError::UnknownColumn(name.to_string()));
            }
            next.set(name.to_string(), value.clone());
        }
        self.store.replace_row(next)
    }

    /// The row [`DatasetController::insert_row`] would add.
    pub fn draft_row(&self) -> Result<Option<Row>, ValidationError> {
        self.store.draft_row()
    }

    /// Returns `None` when there is no row to use as a template or no id
    /// left to give the new row.
    pub fn insert_row(&mut self) -> Option<RowId> {
        let draft = match self.store.draft_row() {
            Ok(Some(draft)) => draft,
            Ok(None) => {
                self.status = Some(StatusMessage::info(
                    "No rows to copy. Import or load data first.",
                ));
                return None;
            }
            Err(err) => {
                self.reject(&err);
                return None;
            }
        };
        let id = draft.id;
        if let Err(err) = self.store.append(draft) {
            self.reject(&err);
            return None;
        }
        log::debug!("{}: inserted row {id}", self.kind);
        self.status = Some(StatusMessage::success("New row added successfully."));
        Some(id)
    }

    /// Removes the given rows and clears the selection. Totals keys are
    /// ignored. Returns the number of rows removed.
    pub fn delete_rows<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = GridKey>,
    {
        let ids: BTreeSet<RowId> = keys.into_iter().filter_map(GridKey::row_id).collect();
        if ids.is_empty() {
            return 0;
        }
        let removed = self.store.remove(&ids);
        self.selection.clear();
        log::debug!("{}: deleted {removed} of {} requested rows", self.kind, ids.len());
        self.status = Some(StatusMessage::success(format!(
            "{removed} row(s) deleted successfully."
        )));
        removed
    }

    pub fn delete_selected(&mut self) -> usize {
        let keys: Vec<GridKey> = self.selection.ids().iter().copied().map(GridKey::Row).collect();
        self.delete_rows(keys)
    }

    /// Only rows present in the store can be selected.
    pub fn select(&mut self, key: GridKey) -> bool {
        match key.row_id() {
            Some(id) if self.store.contains(id) => self.selection.select(key),
            _ => false,
        }
    }

    pub fn deselect(&mut self, key: GridKey) -> bool {
        self.selection.deselect(key)
    }

    pub fn toggle(&mut self, key: GridKey) {
        match key.row_id() {
            Some(id) if self.store.contains(id) || self.selection.contains(id) => {
                self.selection.toggle(key)
            }
            _ => {}
        }
    }

    pub fn set_selection<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = GridKey>,
    {
        self.selection.replace(keys);
        let store = &self.store;
        self.selection.retain(|id| store.contains(id));
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    pub fn clear_search(&mut self) {
        self.search_text.clear();
    }

    pub fn begin_request(&mut self, kind: RequestKind) -> RequestTicket {
        let ticket = self.requests.begin(kind);
        log::debug!("{}: {:?} request #{}", self.kind, kind, ticket.generation);
        ticket
    }

    fn is_stale(&self, ticket: RequestTicket) -> bool {
        if self.requests.is_current(ticket) {
            return false;
        }
        log::debug!(
            "{}: dropping stale {:?} response #{} (latest #{})",
            self.kind,
            ticket.kind,
            ticket.generation,
            self.requests.latest()
        );
        true
    }

    pub fn finish_import(
        &mut self,
        ticket: RequestTicket,
        response: Result<LoadResponse, RemoteError>,
    ) -> Result<Applied<usize>, ControllerError> {
        if self.is_stale(ticket) {
            return Ok(Applied::Stale);
        }
        let response = match response.and_then(LoadResponse::into_result) {
            Ok(response) => response,
            Err(err) => {
                let text = match &err {
                    RemoteError::Rejected(message) if !message.is_empty() => message.clone(),
                    RemoteError::Rejected(_) => {
                        "Error processing file. Please check the format and try again."
                            .to_string()
                    }
                    RemoteError::Unavailable(message) => message.clone(),
                };
                return Err(self.remote_failure(err, text));
            }
        };

        let count = response.data.len();
        self.import_replace(response.data, Some(response.column_order))?;
        log::info!("{}: imported {count} rows", self.kind);
        self.status = Some(StatusMessage::success(
            "File processed successfully! Review the data below.",
        ));
        Ok(Applied::Current(count))
    }

    pub fn finish_load(
        &mut self,
        ticket: RequestTicket,
        response: Result<LoadResponse, RemoteError>,
    ) -> Result<Applied<usize>, ControllerError> {
        if self.is_stale(ticket) {
            return Ok(Applied::Stale);
        }
        let response = match response.and_then(LoadResponse::into_result) {
            Ok(response) => response,
            Err(err) => {
                let text = match &err {
                    RemoteError::Rejected(message) if !message.is_empty() => message.clone(),
                    RemoteError::Rejected(_) => "Failed to load data from database.".to_string(),
                    RemoteError::Unavailable(_) => "Error loading data from database.".to_string(),
                };
                return Err(self.remote_failure(err, text));
            }
        };

        if response.data.is_empty() {
            self.status = Some(StatusMessage::info(format!(
                "No data found in database. Please upload a {} file.",
                self.kind.noun()
            )));
            return Ok(Applied::Current(0));
        }

        let count = response.data.len();
        let retired = response.id_high_water;
        self.import_replace(response.data, Some(response.column_order))?;
        if let Some(RowId(mark)) = retired {
            self.store.raise_high_water(mark);
        }
        log::info!("{}: loaded {count} rows", self.kind);
        self.status = Some(StatusMessage::success(
            "Data loaded from database successfully.",
        ));
        Ok(Applied::Current(count))
    }

    pub fn finish_save(
        &mut self,
        ticket: RequestTicket,
        response: Result<AckResponse, RemoteError>,
    ) -> Result<Applied<()>, ControllerError> {
        if self.is_stale(ticket) {
            return Ok(Applied::Stale);
        }
        match response.and_then(AckResponse::into_result) {
            Ok(ack) => {
                let text = ack
                    .message
                    .unwrap_or_else(|| format!("{} saved successfully.", self.kind.title()));
                self.status = Some(StatusMessage::success(text));
                Ok(Applied::Current(()))
            }
            Err(err) => {
                let text = match &err {
                    RemoteError::Rejected(message) if !message.is_empty() => message.clone(),
                    RemoteError::Rejected(_) => format!("Failed to save {}.", self.kind.noun()),
                    RemoteError::Unavailable(_) => format!("Error saving {}.", self.kind.noun()),
                };
                Err(self.remote_failure(err, text))
            }
        }
    }

    pub fn finish_clear(
        &mut self,
        ticket: RequestTicket,
        response: Result<AckResponse, RemoteError>,
    ) -> Result<Applied<()>, ControllerError> {
        if self.is_stale(ticket) {
            return Ok(Applied::Stale);
        }
        match response.and_then(AckResponse::into_result) {
            Ok(ack) => {
                self.store.clear();
                self.selection.clear();
                self.search_text.clear();
                log::info!("{}: cleared", self.kind);
                let text = ack
                    .message
                    .unwrap_or_else(|| format!("{} data cleared successfully.", self.kind.title()));
                self.status = Some(StatusMessage::success(text));
                Ok(Applied::Current(()))
            }
            Err(err) => {
                let text = match &err {
                    RemoteError::Rejected(message) if !message.is_empty() => message.clone(),
                    RemoteError::Rejected(_) => {
                        format!("Failed to clear {} data.", self.kind.noun())
                    }
                    RemoteError::Unavailable(_) => {
                        format!("Error clearing {} data.", self.kind.noun())
                    }
                };
                Err(self.remote_failure(err, text))
            }
        }
    }

    pub fn import_file(
        &mut self,
        gateway: &dyn PersistenceGateway,
        file: &Path,
    ) -> Result<Applied<usize>, ControllerError> {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        self.status = Some(StatusMessage::info(format!("Processing file \"{name}\"...")));
        let ticket = self.begin_request(RequestKind::Import);
        let response = gateway.import(self.kind, file);
        self.finish_import(ticket, response)
    }

    pub fn load(
        &mut self,
        gateway: &dyn PersistenceGateway,
    ) -> Result<Applied<usize>, ControllerError> {
        let ticket = self.begin_request(RequestKind::Load);
        let response = gateway.load(self.kind);
        self.finish_load(ticket, response)
    }

    pub fn refresh(
        &mut self,
        gateway: &dyn PersistenceGateway,
    ) -> Result<Applied<usize>, ControllerError> {
        self.load(gateway)
    }

    /// Saves, then reloads so the store reflects what the gateway kept.
    ///
    /// The reload is the same dataset, so ids retired before the save stay
    /// retired. A failed reload does not undo a successful save; it only
    /// shows up in the status.
    pub fn save(&mut self, gateway: &dyn PersistenceGateway) -> Result<Applied<()>, ControllerError> {
        let ticket = self.begin_request(RequestKind::Save);
        let payload = self.save_payload();
        let retired = self.store.high_water();
        log::info!("{}: saving {} rows", self.kind, payload.len());
        let response = gateway.save(self.kind, &payload, RowId(retired));
        let applied = self.finish_save(ticket, response)?;
        if applied.is_stale() {
            return Ok(applied);
        }

        let saved_status = self.status.clone();
        match self.load(gateway) {
            Ok(Applied::Current(_)) => {
                self.store.raise_high_water(retired);
                self.status = saved_status;
            }
            Ok(Applied::Stale) => {}
            Err(err) => log::warn!("{}: saved, but reloading failed: {err}", self.kind),
        }
        Ok(applied)
    }

    pub fn clear(&mut self, gateway: &dyn PersistenceGateway) -> Result<Applied<()>, ControllerError> {
        let ticket = self.begin_request(RequestKind::Clear);
        let response = gateway.clear(self.kind);
        self.finish_clear(ticket, response)
    }

    fn reject(&mut self, err: &ValidationError) {
        log::warn!("{}: rejected: {err}", self.kind);
        self.status = Some(StatusMessage::error(err.to_string()));
    }

    fn remote_failure(&mut self, err: RemoteError, text: String) -> ControllerError {
        log::warn!("{}: remote call failed: {err}", self.kind);
        self.status = Some(StatusMessage::error(text));
        ControllerError::Remote(err)
    }
}
