//! Application configuration
//!
//! Read from `heroes.toml` in the project config directory, or from the
//! path given with `--config`. A missing default file means defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const CONFIG_FILE: &str = "heroes.toml";
pub const DEFAULT_DATABASE_FILE: &str = "heroes.db";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the database; the project data dir when unset
    pub data_dir: Option<PathBuf>,
    pub database_file: String,
    /// Used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Publish the sample events when the catalogue is empty
    pub seed_samples: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            seed_samples: false,
        }
    }
}

impl AppConfig {
    /// Load from an explicit path (must exist) or the default location
    pub fn load(explicit: Option<&Path>) -> AppResult<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::ConfigNotFound(path.to_path_buf()));
                }
                Self::load_from(path)
            }
            None => match project_dirs() {
                Some(dirs) => {
                    let path = dirs.config_dir().join(CONFIG_FILE);
                    if path.exists() {
                        Self::load_from(&path)
                    } else {
                        Ok(Self::default())
                    }
                }
                None => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Full path of the database file
    pub fn database_path(&self) -> AppResult<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => project_dirs()
                .ok_or(AppError::NoDataDir)?
                .data_dir()
                .to_path_buf(),
        };
        Ok(dir.join(&self.database_file))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "atomheart", "heroes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_empty_file() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.log_filter, "info");
        assert!(!config.seed_samples);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            data_dir = "/tmp/heroes"
            seed_samples = true
            "#,
        )
        .unwrap();

        assert!(config.seed_samples);
        assert_eq!(config.database_file, DEFAULT_DATABASE_FILE);
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/heroes").join(DEFAULT_DATABASE_FILE)
        );
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "log_filter = \"heroes_core=debug\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.log_filter, "heroes_core=debug");
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, AppError::ConfigNotFound(_)));
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            AppConfig::from_toml("seed_samples = \"yes\""),
            Err(AppError::Config(_))
        ));
    }
}
