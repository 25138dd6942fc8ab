//! Lab value validation.
//!
//! Every numeric field of a [`PatientLabRecord`] has a fixed, inclusive acceptable range. The
//! validator reports violations as data ([`FieldError`], [`FieldErrors`]) and never fails: its
//! output is meant to be shown next to form inputs and to gate submission for analysis.

use crate::constants::INVALID_NUMBER_MESSAGE;
use crate::record::{LabField, PatientLabRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Inclusive acceptable range for a lab field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LabRange {
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

impl LabRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Declared range for a field.
pub fn range_for(field: LabField) -> LabRange {
    let (min, max, unit) = match field {
        LabField::Egfr => (1.0, 200.0, "mL/min"),
        LabField::Hemoglobin => (5.0, 18.0, "g/dL"),
        LabField::Ferritin => (10.0, 5000.0, "ng/mL"),
        LabField::Tsat => (1.0, 100.0, "%"),
        LabField::Calcium => (6.0, 12.0, "mg/dL"),
        LabField::Phosphorus => (2.0, 12.0, "mg/dL"),
        LabField::Pth => (10.0, 5000.0, "pg/mL"),
        LabField::AlkalinePhosphatase => (20.0, 1000.0, "U/L"),
    };
    LabRange { min, max, unit }
}

/// A single field violation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldError {
    NotANumber,
    OutOfRange(LabRange),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::NotANumber => f.write_str(INVALID_NUMBER_MESSAGE),
            FieldError::OutOfRange(range) => {
                write!(f, "{} - {} {}", range.min, range.max, range.unit)
            }
        }
    }
}

/// Checks a value against a field's declared range.
///
/// Fields without a declared range (for example `ckdStage`) are always valid.
pub fn validate_field(field_name: &str, value: f64) -> Option<FieldError> {
    let field = LabField::from_name(field_name)?;
    validate_lab_field(field, value)
}

pub fn validate_lab_field(field: LabField, value: f64) -> Option<FieldError> {
    if value.is_nan() {
        return Some(FieldError::NotANumber);
    }
    let range = range_for(field);
    if !range.contains(value) {
        return Some(FieldError::OutOfRange(range));
    }
    None
}

/// Parses raw form text as a number. Unparsable text becomes NaN so that it is reported as
/// [`FieldError::NotANumber`] rather than rejected outright.
pub fn parse_numeric(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Per-field error messages keyed by field. An empty message means the field was valid when it
/// was last checked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<LabField, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of a check; `None` stores an empty message.
    pub fn set(&mut self, field: LabField, error: Option<FieldError>) {
        let message = error.map(|e| e.to_string()).unwrap_or_default();
        self.0.insert(field, message);
    }

    /// Message for a field, or `None` if the field is clear or has never been checked.
    pub fn get(&self, field: LabField) -> Option<&str> {
        self.0
            .get(&field)
            .map(String::as_str)
            .filter(|message| !message.is_empty())
    }

    /// True when no entry carries a message.
    pub fn is_clear(&self) -> bool {
        self.0.values().all(|message| message.is_empty())
    }

    /// Entries that carry a message, in field order.
    pub fn violations(&self) -> impl Iterator<Item = (LabField, &str)> {
        self.0
            .iter()
            .filter(|(_, message)| !message.is_empty())
            .map(|(field, message)| (*field, message.as_str()))
    }

    pub fn len(&self) -> usize {
        self.violations().count()
    }

    pub fn is_empty(&self) -> bool {
        self.is_clear()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.violations() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Validates every declared-range field of a record and returns all violations.
///
/// An absent eGFR is not a violation.
pub fn validate_record(record: &PatientLabRecord) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in LabField::ALL {
        if let Some(value) = record.value(field) {
            if let Some(error) = validate_lab_field(field, value) {
                errors.set(field, Some(error));
            }
        }
    }
    errors
}

/// True iff the cached error map is clear and a fresh validation of the record finds nothing.
///
/// The cached map can lag behind programmatic updates such as an eGFR write-back, so it is
/// never trusted on its own.
pub fn form_is_valid(record: &PatientLabRecord, errors: &FieldErrors) -> bool {
    errors.is_clear() && validate_record(record).is_clear()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phosphorus_below_minimum_cites_range_and_unit() {
        let error = validate_field("phosphorus", 1.5).expect("out of range");
        assert_eq!(error.to_string(), "2 - 12 mg/dL");
        assert!(matches!(error, FieldError::OutOfRange(r) if r.min == 2.0 && r.max == 12.0));
    }

    #[test]
    fn phosphorus_within_range_is_valid() {
        assert_eq!(validate_field("phosphorus", 6.1), None);
    }

    #[test]
    fn bounds_are_inclusive() {
        for field in LabField::ALL {
            let range = range_for(field);
            assert_eq!(validate_lab_field(field, range.min), None, "{field} min");
            assert_eq!(validate_lab_field(field, range.max), None, "{field} max");
            assert!(validate_lab_field(field, range.min - 0.01).is_some(), "{field} below");
            assert!(validate_lab_field(field, range.max + 0.01).is_some(), "{field} above");
        }
    }

    fn window(field: LabField) -> String {
        FieldError::OutOfRange(range_for(field)).to_string()
    }

    #[test]
    fn range_table_matches_declared_values() {
        assert_eq!(window(LabField::Egfr), "1 - 200 mL/min");
        assert_eq!(window(LabField::Hemoglobin), "5 - 18 g/dL");
        assert_eq!(window(LabField::Ferritin), "10 - 5000 ng/mL");
        assert_eq!(window(LabField::Tsat), "1 - 100 %");
        assert_eq!(window(LabField::Calcium), "6 - 12 mg/dL");
        assert_eq!(window(LabField::Pth), "10 - 5000 pg/mL");
        assert_eq!(window(LabField::AlkalinePhosphatase), "20 - 1000 U/L");
    }

    #[test]
    fn nan_is_reported_as_invalid_number() {
        let error = validate_field("hemoglobin", f64::NAN).expect("nan");
        assert_eq!(error, FieldError::NotANumber);
        assert_eq!(error.to_string(), "invalid number");
        assert_eq!(
            validate_field("calcium", parse_numeric("abc")),
            Some(FieldError::NotANumber)
        );
        assert_eq!(validate_field("calcium", parse_numeric(" 9.1 ")), None);
    }

    #[test]
    fn fields_without_a_range_are_always_valid() {
        assert_eq!(validate_field("ckdStage", f64::NAN), None);
        assert_eq!(validate_field("dialysisType", -1.0), None);
        assert_eq!(validate_field("unknown", 1e9), None);
        assert!(LabField::from_name("ckdStage").is_none());
    }

    #[test]
    fn default_record_is_valid() {
        let record = PatientLabRecord::default();
        assert!(validate_record(&record).is_clear());
        assert!(form_is_valid(&record, &FieldErrors::new()));
        // Re-validating a valid record stays valid.
        assert!(validate_record(&record).is_clear());
    }

    #[test]
    fn validate_record_reports_every_violation() {
        let record = PatientLabRecord {
            egfr: Some(0.5),
            hemoglobin: 20.0,
            phosphorus: 1.5,
            ..PatientLabRecord::default()
        };
        let errors = validate_record(&record);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get(LabField::Egfr), Some("1 - 200 mL/min"));
        assert_eq!(errors.get(LabField::Hemoglobin), Some("5 - 18 g/dL"));
        assert_eq!(errors.get(LabField::Phosphorus), Some("2 - 12 mg/dL"));
        assert_eq!(errors.get(LabField::Calcium), None);
    }

    #[test]
    fn single_field_message_matches_whole_record_message() {
        let record = PatientLabRecord {
            pth: 6000.0,
            ..PatientLabRecord::default()
        };
        let whole = validate_record(&record);
        let single = validate_field("pth", 6000.0).expect("invalid").to_string();
        assert_eq!(whole.get(LabField::Pth), Some(single.as_str()));
    }

    #[test]
    fn absent_egfr_is_not_a_violation() {
        let record = PatientLabRecord {
            egfr: None,
            ..PatientLabRecord::default()
        };
        assert!(validate_record(&record).is_clear());
    }

    #[test]
    fn form_is_invalid_when_cached_map_has_a_message() {
        let record = PatientLabRecord::default();
        let mut errors = FieldErrors::new();
        errors.set(LabField::Tsat, Some(FieldError::NotANumber));
        assert!(!form_is_valid(&record, &errors));
    }

    #[test]
    fn form_is_invalid_when_cached_map_is_stale() {
        // The cache says eGFR is fine, but the record now holds an out-of-range value.
        let record = PatientLabRecord {
            egfr: Some(250.0),
            ..PatientLabRecord::default()
        };
        let mut errors = FieldErrors::new();
        errors.set(LabField::Egfr, None);
        assert!(errors.is_clear());
        assert!(!form_is_valid(&record, &errors));
    }

    #[test]
    fn empty_entries_count_as_clear() {
        let mut errors = FieldErrors::new();
        errors.set(LabField::Calcium, None);
        errors.set(LabField::Pth, None);
        assert!(errors.is_clear());
        assert_eq!(errors.len(), 0);
        assert_eq!(errors.to_string(), "");
    }

    #[test]
    fn serialises_as_field_keyed_map() {
        let mut errors = FieldErrors::new();
        errors.set(LabField::AlkalinePhosphatase, Some(FieldError::NotANumber));
        let json = serde_json::to_value(&errors).expect("serialise");
        assert_eq!(json["alkalinePhosphatase"], "invalid number");
    }
}
