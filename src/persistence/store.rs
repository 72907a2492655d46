use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::tracking::AnchorId;

/// File name of the anchor table inside the data directory
pub const DEFAULT_TABLE_FILE: &str = "persistent_objects.json";

/// World-anchor identity to model file key
pub type AnchorTable = BTreeMap<AnchorId, String>;

/// JSON file holding the anchor table between sessions.
///
/// A store without a path loads an empty table and refuses every save, so
/// placement keeps working on hosts without a data directory.
#[derive(Debug, Clone)]
pub struct AnchorTableStore {
    path: Option<PathBuf>,
}

impl AnchorTableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn unavailable() -> Self {
        Self { path: None }
    }

    /// Store at the platform data directory
    pub fn at_default_location() -> Result<Self, PersistenceError> {
        Self::default_path().map(Self::new)
    }

    pub fn default_path() -> Result<PathBuf, PersistenceError> {
        ProjectDirs::from("", "", "spatial-placement")
            .map(|dirs| dirs.data_dir().join(DEFAULT_TABLE_FILE))
            .ok_or(PersistenceError::NoDataDirectory)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the table. A missing file is an empty table.
    pub fn try_load(&self) -> Result<AnchorTable, PersistenceError> {
        let path = self.path.as_ref().ok_or(PersistenceError::NoDataDirectory)?;
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(AnchorTable::new()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Decode {
            path: path.clone(),
            source,
        })
    }

    /// Like [`try_load`](Self::try_load) but degrades to an empty table.
    pub fn load(&self) -> AnchorTable {
        match self.try_load() {
            Ok(table) => {
                debug!(entries = table.len(), "Loaded anchor table");
                table
            }
            Err(err) => {
                warn!(error = %err, "Starting with an empty anchor table");
                AnchorTable::new()
            }
        }
    }

    /// Replaces the file contents. The old file stays intact if any step fails.
    pub fn save(&self, table: &AnchorTable) -> Result<(), PersistenceError> {
        let path = self.path.as_ref().ok_or(PersistenceError::NoDataDirectory)?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let write_err = |source| PersistenceError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(dir).map_err(write_err)?;
        let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, table).map_err(PersistenceError::Encode)?;
            writer.flush().map_err(write_err)?;
        }
        file.persist(path)
            .map_err(|err| write_err(err.error))?;

        debug!(path = %path.display(), entries = table.len(), "Saved anchor table");
        Ok(())
    }
}
