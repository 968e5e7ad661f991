//! Application state management

use std::path::{Path, PathBuf};

use heroes_core::Database;
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application state
///
/// The database is opened once here and lent to every command.
pub struct AppState {
    pub db: Database,
    db_path: PathBuf,
}

impl AppState {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let db_path = config.database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        info!(path = %db_path.display(), schema = db.schema_version(), "Opened database");

        if config.seed_samples {
            let added = db.events().seed_samples()?;
            if added > 0 {
                info!(added, "Seeded sample events");
            }
        }

        Ok(Self { db, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
