//! Key-value storage backends for the history list.

use crate::history::HistoryEntry;
use crate::{HistoryError, HistoryResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Load-all / save-all persistence for the history list.
pub trait HistoryStore: Send + Sync {
    fn load_all(&self) -> HistoryResult<Vec<HistoryEntry>>;
    fn save_all(&self, entries: &[HistoryEntry]) -> HistoryResult<()>;
}

/// Stores the list as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonFileHistoryStore {
    /// A missing or blank file is an empty history.
    fn load_all(&self) -> HistoryResult<Vec<HistoryEntry>> {
        if !self.path.exists() {
            tracing::debug!("no history file at {}", self.path.display());
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut deserializer = serde_json::Deserializer::from_str(&contents);
        let entries: Vec<HistoryEntry> = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|err| {
                let location = err.path().to_string();
                let location = if location.is_empty() || location == "." {
                    "<root>".to_string()
                } else {
                    location
                };
                let message = err.into_inner().to_string();
                tracing::warn!(
                    "failed to parse history {} at {}: {}",
                    self.path.display(),
                    location,
                    message
                );
                HistoryError::Malformed {
                    path: self.path.clone(),
                    location,
                    message,
                }
            })?;

        tracing::info!(
            "loaded {} history entries from {}",
            entries.len(),
            self.path.display()
        );
        Ok(entries)
    }

    /// Writes to a sibling temporary file and renames it over the target.
    fn save_all(&self, entries: &[HistoryEntry]) -> HistoryResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(entries).map_err(HistoryError::Serialization)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            "saved {} history entries to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Process-local store, used by tests and when no file is configured.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn load_all(&self) -> HistoryResult<Vec<HistoryEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save_all(&self, entries: &[HistoryEntry]) -> HistoryResult<()> {
        *self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = entries.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::sample_entry;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileHistoryStore::new(temp.path().join("absent.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn blank_file_loads_as_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.json");
        fs::write(&path, "  \n").unwrap();
        let store = JsonFileHistoryStore::new(&path);
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn saves_and_reloads_entries() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("history.json");
        let store = JsonFileHistoryStore::new(&path);

        let entries = vec![sample_entry("b", 2_000), sample_entry("a", 1_000)];
        store.save_all(&entries).unwrap();

        assert!(path.is_file());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load_all().unwrap(), entries);
    }

    #[test]
    fn malformed_file_reports_json_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.json");
        let mut value = serde_json::to_value(vec![sample_entry("a", 1_000)]).unwrap();
        value[0]["patientData"]["ckdStage"] = serde_json::json!("9");
        fs::write(&path, value.to_string()).unwrap();

        let err = JsonFileHistoryStore::new(&path)
            .load_all()
            .expect_err("should reject unknown stage");
        match err {
            HistoryError::Malformed { location, .. } => {
                assert!(location.contains("patientData.ckdStage"), "{location}");
            }
            other => panic!("expected Malformed error, got {other:?}"),
        }
    }

    #[test]
    fn in_memory_store_round_trips() {
        let store = InMemoryHistoryStore::new();
        assert!(store.load_all().unwrap().is_empty());
        store.save_all(&[sample_entry("a", 1)]).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
    }
}
