use std::path::{Path, PathBuf};

use crate::config::params::AllParams;

/// Persistent parameter store backed by a JSON file.
pub struct ParamsStore {
    path: PathBuf,
}

impl ParamsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load parameters from disk, returning defaults when the file does
    /// not exist yet.
    pub fn load(&self) -> Result<AllParams, String> {
        if !self.path.exists() {
            return Ok(AllParams::default());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    }

    /// Save parameters to disk atomically (write `.tmp` then rename).
    pub fn save(&self, params: &AllParams) -> Result<(), String> {
        let json = serde_json::to_string_pretty(params).map_err(|e| e.to_string())?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|e| e.to_string())?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| e.to_string())?;

        Ok(())
    }
}
