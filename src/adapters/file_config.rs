//! JSON file configuration storage.

use std::fs;
use std::path::PathBuf;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::RunnerConfig;

/// Loads and saves the runner configuration as pretty-printed JSON.
/// A missing file maps to [`ConfigError::NotFound`] so the caller can
/// fall back to defaults and persist them.
pub struct FileConfigAdapter {
    path: PathBuf,
}

impl FileConfigAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn load(&self) -> Result<RunnerConfig, ConfigError> {
        let raw = fs::read_to_string(&self.path)?;
        let config: RunnerConfig =
            serde_json::from_str(&raw).map_err(|err| ConfigError::Corrupted(err.to_string()))?;
        config
            .validate()
            .map_err(|err| ConfigError::Corrupted(err.to_string()))?;
        Ok(config)
    }

    fn save(&self, config: &RunnerConfig) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Corrupted(err.to_string()))?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}
