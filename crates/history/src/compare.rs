//! Side-by-side comparison of two history entries.

use crate::history::HistoryEntry;
use drc_core::validation::range_for;
use drc_core::LabField;
use serde::{Deserialize, Serialize};

/// Direction of change between two measurements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Unchanged,
}

impl Trend {
    fn of(delta: f64) -> Self {
        if delta > 0.0 {
            Trend::Up
        } else if delta < 0.0 {
            Trend::Down
        } else {
            Trend::Unchanged
        }
    }
}

/// One lab panel field across two entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabTrend {
    pub field: LabField,
    pub label: String,
    pub unit: String,
    pub previous: f64,
    pub current: f64,
    /// `current - previous`, rounded to one decimal place.
    pub delta: f64,
    pub trend: Trend,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub previous_id: String,
    pub current_id: String,
    pub previous_timestamp: i64,
    pub current_timestamp: i64,
    pub rows: Vec<LabTrend>,
    pub previous_summary: String,
    pub current_summary: String,
    /// Anaemia then MBD recommendations of the newer entry.
    pub current_recommendations: Vec<String>,
}

/// Compares two entries, ordering them oldest first regardless of argument order.
pub fn compare(a: &HistoryEntry, b: &HistoryEntry) -> Comparison {
    let (previous, current) = if b.timestamp < a.timestamp {
        (b, a)
    } else {
        (a, b)
    };

    let rows = LabField::PANEL
        .into_iter()
        .map(|field| {
            let before = previous.patient_data.value(field).unwrap_or(f64::NAN);
            let after = current.patient_data.value(field).unwrap_or(f64::NAN);
            let diff = after - before;
            LabTrend {
                field,
                label: field.label().to_string(),
                unit: range_for(field).unit.to_string(),
                previous: before,
                current: after,
                delta: (diff * 10.0).round() / 10.0,
                trend: Trend::of(diff),
            }
        })
        .collect();

    Comparison {
        previous_id: previous.id.clone(),
        current_id: current.id.clone(),
        previous_timestamp: previous.timestamp,
        current_timestamp: current.timestamp,
        rows,
        previous_summary: previous.result.overall_summary.clone(),
        current_summary: current.result.overall_summary.clone(),
        current_recommendations: current
            .result
            .all_recommendations()
            .map(str::to_string)
            .collect(),
    }
}

/// Updates the set of entries selected for comparison (at most two).
///
/// Selecting an already-selected id deselects it. With two already selected, the first is kept
/// and the second replaced.
pub fn toggle_comparison(selected: &[String], id: &str) -> Vec<String> {
    if selected.iter().any(|s| s == id) {
        return selected.iter().filter(|s| *s != id).cloned().collect();
    }
    match selected {
        [] | [_] => {
            let mut next = selected.to_vec();
            next.push(id.to_string());
            next
        }
        [first, ..] => vec![first.clone(), id.to_string()],
    }
}
