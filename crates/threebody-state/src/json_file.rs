use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use threebody_models::DashboardRecord;
use tracing::debug;

use crate::error::StateError;
use crate::StateStore;

/// Dashboard record stored as a JSON document on disk.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a concurrent reader sees either the old or the new record.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "dashboard_state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl StateStore for JsonFileStore {
    fn save(&self, record: &DashboardRecord) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let body = serde_json::to_vec_pretty(record)?;
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp).map_err(|e| io_error(&tmp, e))?;
            file.write_all(&body).map_err(|e| io_error(&tmp, e))?;
            file.sync_all().map_err(|e| io_error(&tmp, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, e))?;

        debug!(path = %self.path.display(), "Dashboard state written");
        Ok(())
    }

    fn load(&self) -> Result<Option<DashboardRecord>, StateError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }
}
