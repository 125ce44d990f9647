//! JSON file persistence shared by the repositories.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AppResult;

/// A JSON document on disk, rewritten atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, or its default value if the file does not exist yet.
    pub fn load<T: DeserializeOwned + Default>(&self) -> AppResult<T> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "Data file not found, starting fresh");
            return Ok(T::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the document through a temp file and rename it into place.
    pub fn save<T: Serialize>(&self, value: &T) -> AppResult<()> {
        let content = serde_json::to_string_pretty(value)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Saved data file");
        Ok(())
    }
}
