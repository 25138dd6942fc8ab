//! Explicitly-owned lab form state.
//!
//! [`LabForm`] holds the record being edited together with its incrementally maintained error
//! map. Edits update one field and one error entry at a time. The calculator writes back eGFR
//! and stage and refreshes the eGFR entry. [`LabForm::submit`] always re-validates.

use crate::egfr::{self, CreatinineInput};
use crate::record::{CkdStage, DialysisType, LabField, PatientLabRecord};
use crate::validation::{self, FieldErrors};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabForm {
    record: PatientLabRecord,
    errors: FieldErrors,
}

impl LabForm {
    /// A form seeded with the default dialysis-patient record.
    pub fn new() -> Self {
        Self::default()
    }

    /// A form loaded from an existing record (for example a history snapshot), with no errors.
    pub fn from_record(record: PatientLabRecord) -> Self {
        Self {
            record,
            errors: FieldErrors::new(),
        }
    }

    pub fn record(&self) -> &PatientLabRecord {
        &self.record
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Stores raw input for a numeric field and refreshes that field's error entry.
    ///
    /// Returns the field's new error message, if any.
    pub fn set_numeric(&mut self, field: LabField, raw: &str) -> Option<String> {
        let value = validation::parse_numeric(raw);
        self.record.set_value(field, value);
        let error = validation::validate_lab_field(field, value);
        self.errors.set(field, error);
        error.map(|e| e.to_string())
    }

    pub fn set_stage(&mut self, stage: CkdStage) {
        self.record.ckd_stage = stage;
    }

    pub fn set_dialysis_type(&mut self, dialysis_type: DialysisType) {
        self.record.dialysis_type = dialysis_type;
    }

    /// Applies the eGFR calculator to the record.
    ///
    /// Returns `false` and leaves the form untouched when creatinine or age is not positive.
    pub fn apply_estimate(&mut self, input: &CreatinineInput) -> bool {
        if !input.is_computable() {
            return false;
        }
        let record = std::mem::take(&mut self.record);
        self.record = egfr::apply_estimate(record, input);
        let error = self
            .record
            .egfr
            .and_then(|value| validation::validate_lab_field(LabField::Egfr, value));
        self.errors.set(LabField::Egfr, error);
        true
    }

    pub fn is_valid(&self) -> bool {
        validation::form_is_valid(&self.record, &self.errors)
    }

    /// Returns the record if it may be submitted for analysis.
    ///
    /// Otherwise every declared-range field is re-validated, the error map is replaced with the
    /// complete set of violations and a copy of it is returned.
    pub fn submit(&mut self) -> Result<PatientLabRecord, FieldErrors> {
        if self.is_valid() {
            return Ok(self.record.clone());
        }

        let errors = validation::validate_record(&self.record);
        tracing::debug!(violations = errors.len(), "lab form submission blocked");
        self.errors = errors.clone();
        Err(errors)
    }
}
