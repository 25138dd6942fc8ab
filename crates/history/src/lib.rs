//! DRC analysis history
//!
//! This crate keeps the ordered list of past analyses (`{record, result, timestamp}` snapshots)
//! behind a simple key-value contract.
//!
//! ## Design Principles
//!
//! - The whole list is loaded once on start and saved whole on every change
//! - Entries are immutable snapshots; the list is ordered newest first
//! - The core never touches the store: callers record an analysis after it succeeds
//!
//! ## Example Usage
//!
//! ```no_run
//! use drc_history::{History, JsonFileHistoryStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonFileHistoryStore::new("drc_exam_history.json");
//! let history = History::load(store)?;
//! for entry in history.entries() {
//!     println!("{} {}", entry.id, entry.result.overall_summary);
//! }
//! # Ok(())
//! # }
//! ```

mod compare;
mod history;
mod store;

pub use compare::{compare, toggle_comparison, Comparison, LabTrend, Trend};
pub use history::{History, HistoryEntry};
pub use store::{HistoryStore, InMemoryHistoryStore, JsonFileHistoryStore};

use std::path::PathBuf;

/// Errors that can occur during history operations
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// I/O error reading or writing the backing file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored history does not match the expected schema
    #[error("malformed history file {} at {location}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        location: String,
        message: String,
    },

    /// History could not be serialised
    #[error("failed to serialize history: {0}")]
    Serialization(serde_json::Error),

    /// No entry with the given id
    #[error("history entry not found: {0}")]
    NotFound(String),

    /// Comparison needs two distinct entries
    #[error("invalid comparison: {0}")]
    InvalidComparison(String),
}

/// Type alias for Results that can fail with a [`HistoryError`].
pub type HistoryResult<T> = Result<T, HistoryError>;
