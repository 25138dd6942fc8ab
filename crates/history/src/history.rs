//! The in-memory history list and its operations.

use crate::compare::{self, Comparison};
use crate::store::HistoryStore;
use crate::{HistoryError, HistoryResult};
use chrono::{DateTime, TimeZone, Utc};
use drc_core::{AnalysisResult, PatientLabRecord};
use serde::{Deserialize, Serialize};

/// An immutable snapshot of one completed analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub patient_data: PatientLabRecord,
    pub result: AnalysisResult,
}

impl HistoryEntry {
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

/// History list backed by a [`HistoryStore`]: loaded once, saved whole on every change.
pub struct History {
    store: Box<dyn HistoryStore>,
    entries: Vec<HistoryEntry>,
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl History {
    pub fn load(store: impl HistoryStore + 'static) -> HistoryResult<Self> {
        let entries = store.load_all()?;
        Ok(Self {
            store: Box::new(store),
            entries,
        })
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Prepends a snapshot of a completed analysis and persists the list.
    pub fn record(
        &mut self,
        record: PatientLabRecord,
        result: AnalysisResult,
        now: DateTime<Utc>,
    ) -> HistoryResult<HistoryEntry> {
        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: now.timestamp_millis(),
            patient_data: record,
            result,
        };

        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.push(entry.clone());
        next.extend(self.entries.iter().cloned());
        self.commit(next)?;

        tracing::info!("recorded history entry {}", entry.id);
        Ok(entry)
    }

    /// Removes an entry. Returns `false` if no entry had that id.
    pub fn delete(&mut self, id: &str) -> HistoryResult<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next = self.entries.iter().filter(|e| e.id != id).cloned().collect();
        self.commit(next)?;
        Ok(true)
    }

    pub fn clear(&mut self) -> HistoryResult<()> {
        self.commit(Vec::new())
    }

    /// Compares two entries by id, oldest first.
    pub fn compare(&self, first_id: &str, second_id: &str) -> HistoryResult<Comparison> {
        if first_id == second_id {
            return Err(HistoryError::InvalidComparison(
                "select two different entries".into(),
            ));
        }
        let first = self
            .get(first_id)
            .ok_or_else(|| HistoryError::NotFound(first_id.to_string()))?;
        let second = self
            .get(second_id)
            .ok_or_else(|| HistoryError::NotFound(second_id.to_string()))?;
        Ok(compare::compare(first, second))
    }

    /// Saves first so that a failed write leaves the in-memory list unchanged.
    fn commit(&mut self, next: Vec<HistoryEntry>) -> HistoryResult<()> {
        self.store.save_all(&next)?;
        self.entries = next;
        Ok(())
    }
}
