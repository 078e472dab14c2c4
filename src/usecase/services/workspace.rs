use std::path::Path;
use std::sync::Arc;

use crate::domain::entities::dataset::DatasetKind;
use crate::usecase::ports::gateway::PersistenceGateway;
use crate::usecase::services::controller::{ControllerError, DatasetController};
use crate::usecase::services::requests::Applied;

/// Both dataset controllers sharing one gateway.
pub struct Workspace {
    gateway: Arc<dyn PersistenceGateway>,
    configuration: DatasetController,
    preferences: DatasetController,
}

impl Workspace {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            gateway,
            configuration: DatasetController::new(DatasetKind::Configuration),
            preferences: DatasetController::new(DatasetKind::Preferences),
        }
    }

    pub fn controller(&self, kind: DatasetKind) -> &DatasetController {
        match kind {
            DatasetKind::Configuration => &self.configuration,
            DatasetKind::Preferences => &self.preferences,
        }
    }

    pub fn controller_mut(&mut self, kind: DatasetKind) -> &mut DatasetController {
        match kind {
            DatasetKind::Configuration => &mut self.configuration,
            DatasetKind::Preferences => &mut self.preferences,
        }
    }

    /// Initial load of one dataset, as done when its page is opened.
    pub fn open(&mut self, kind: DatasetKind) -> Result<Applied<usize>, ControllerError> {
        let gateway = Arc::clone(&self.gateway);
        self.controller_mut(kind).load(gateway.as_ref())
    }

    pub fn import(
        &mut self,
        kind: DatasetKind,
        file: &Path,
    ) -> Result<Applied<usize>, ControllerError> {
        let gateway = Arc::clone(&self.gateway);
        self.controller_mut(kind).import_file(gateway.as_ref(), file)
    }

    pub fn save(&mut self, kind: DatasetKind) -> Result<Applied<()>, ControllerError> {
        let gateway = Arc::clone(&self.gateway);
        self.controller_mut(kind).save(gateway.as_ref())
    }

    pub fn refresh(&mut self, kind: DatasetKind) -> Result<Applied<usize>, ControllerError> {
        let gateway = Arc::clone(&self.gateway);
        self.controller_mut(kind).refresh(gateway.as_ref())
    }

    pub fn clear(&mut self, kind: DatasetKind) -> Result<Applied<()>, ControllerError> {
        let gateway = Arc::clone(&self.gateway);
        self.controller_mut(kind).clear(gateway.as_ref())
    }
}
