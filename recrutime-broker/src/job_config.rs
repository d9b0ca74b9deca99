//! Job offer configuration edited by the admin UI.
//!
//! The current [`JobConfig`] lives in memory and, when the store has a path, is
//! mirrored to a JSON file written with the same temp-file-and-persist scheme as
//! the handoff store. A missing or unreadable file at startup yields the default
//! (empty) configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::persist::{parent_directory, write_json};

/// Default location of the persisted job configuration.
pub const DEFAULT_JOB_CONFIG_PATH: &str = "runtime/admin_config.json";

/// The job offer interviews are run for. Every field may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub title: String,
    pub department: String,
    pub experience: String,
    pub salary: String,
    pub location: String,
    pub requirements: String,
    pub company_name: String,
}

#[derive(Debug)]
pub struct JobConfigStore {
    path: Option<PathBuf>,
    current: RwLock<JobConfig>,
}

impl JobConfigStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: RwLock::new(JobConfig::default()),
        }
    }

    /// Load the configuration persisted at `path`, falling back to the default.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match read_config(&path) {
            Ok(Some(config)) => config,
            Ok(None) => JobConfig::default(),
            Err(e) => {
                warn!("Failed to load job config {}: {}", path.display(), e);
                JobConfig::default()
            }
        };

        Self {
            path: Some(path),
            current: RwLock::new(current),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> JobConfig {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the configuration. The file is written before the in-memory copy
    /// changes, so a failed write leaves both untouched.
    pub fn save(&self, config: JobConfig) -> StoreResult<()> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(path) = &self.path {
            std::fs::create_dir_all(parent_directory(path))?;
            write_json(path, &config)?;
            info!("Saved job config to {}", path.display());
        }

        *current = config;
        Ok(())
    }
}

fn read_config(path: &Path) -> StoreResult<Option<JobConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}
