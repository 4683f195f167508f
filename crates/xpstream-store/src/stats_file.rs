//! The JSON stats file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};
use xpstream_core::maintenance::{SinkError, StatsSink};
use xpstream_core::service::RewardService;
use xpstream_core::stats::{RestoreReport, StatsSnapshot};

use crate::error::StoreError;

/// A stats file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsFile {
    path: PathBuf,
}

impl StatsFile {
    /// Point at the file at `path`. Nothing is touched until a load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read raw entries keyed by recipient ID string.
    ///
    /// A missing file is an empty map. Values that are not non-negative
    /// integers are skipped with a warning; keys are passed through
    /// unparsed so the aggregator can report malformed IDs itself.
    pub fn load(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No stats file yet, starting empty");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let raw: BTreeMap<String, Value> = serde_json::from_str(&contents)?;
        let mut entries = BTreeMap::new();
        for (key, value) in raw {
            if let Some(total) = value.as_u64() {
                entries.insert(key, total);
            } else {
                warn!(key = key.as_str(), value = %value, "Skipping non-integer total in stats file");
            }
        }
        Ok(entries)
    }

    /// Load the file into `service`'s aggregator.
    pub fn load_into(&self, service: &RewardService) -> Result<RestoreReport, StoreError> {
        let entries = self.load()?;
        Ok(service.restore_stats(entries))
    }

    /// Replace the file with `snapshot`.
    pub fn save(&self, snapshot: &StatsSnapshot) -> Result<(), StoreError> {
        let document: BTreeMap<String, u64> = snapshot
            .iter()
            .map(|(id, total)| (id.to_string(), *total))
            .collect();
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = self.staging_path();
        fs::write(&staging, json)?;
        fs::rename(&staging, &self.path)?;

        debug!(path = %self.path.display(), entries = document.len(), "Stats file written");
        Ok(())
    }

    /// Sibling file written before the rename.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatsSink for StatsFile {
    fn save(&self, snapshot: &StatsSnapshot) -> Result<(), SinkError> {
        Self::save(self, snapshot).map_err(|e| SinkError::Failed {
            message: e.to_string(),
        })
    }
}
