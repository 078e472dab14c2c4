use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::ProjectDirs;

pub const DB_PATH_ENV: &str = "TABLEDESK_DB";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
}

impl AppConfig {
    /// Explicit path, then `TABLEDESK_DB`, then the per-user data directory.
    pub fn resolve(db_override: Option<PathBuf>) -> Result<Self> {
        let env_path = std::env::var_os(DB_PATH_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let db_path = match db_override.or(env_path) {
            Some(path) => path,
            None => default_db_path()?,
        };
        Ok(Self { db_path })
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "tabledesk", "tabledesk")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))?;
    Ok(project_dirs.data_local_dir().join("datasets.sqlite"))
}
