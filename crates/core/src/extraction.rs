//! Document extraction collaborator boundary.
//!
//! An extractor reads an uploaded lab report and guesses a partial record. Its output is never
//! trusted as-is: [`merge_extracted`] copies the guessed fields into a record and validates each
//! numeric one.

use crate::record::{CkdStage, DialysisType, LabField, PatientLabRecord};
use crate::validation::{self, FieldErrors};
use crate::CoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A lab report uploaded for extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedDocument {
    /// e.g. `application/pdf`, `image/png`.
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Extractor output: any subset of the record's fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialLabRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ckd_stage: Option<CkdStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialysis_type: Option<DialysisType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egfr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hemoglobin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ferritin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calcium: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phosphorus: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alkaline_phosphatase: Option<f64>,
}

impl PartialLabRecord {
    pub fn value(&self, field: LabField) -> Option<f64> {
        match field {
            LabField::Egfr => self.egfr,
            LabField::Hemoglobin => self.hemoglobin,
            LabField::Ferritin => self.ferritin,
            LabField::Tsat => self.tsat,
            LabField::Calcium => self.calcium,
            LabField::Phosphorus => self.phosphorus,
            LabField::Pth => self.pth,
            LabField::AlkalinePhosphatase => self.alkaline_phosphatase,
        }
    }
}

#[async_trait]
pub trait LabExtractor: Send + Sync {
    async fn extract(&self, document: &UploadedDocument) -> CoreResult<PartialLabRecord>;
}

/// Copies the extracted fields into `record` and validates each copied numeric field.
///
/// The returned map has an entry for every copied numeric field (empty when valid), so it can
/// stand in directly as the form's error map.
pub fn merge_extracted(
    record: PatientLabRecord,
    partial: &PartialLabRecord,
) -> (PatientLabRecord, FieldErrors) {
    let mut merged = record;
    let mut errors = FieldErrors::new();

    if let Some(stage) = partial.ckd_stage {
        merged.ckd_stage = stage;
    }
    if let Some(dialysis_type) = partial.dialysis_type {
        merged.dialysis_type = dialysis_type;
    }

    for field in LabField::ALL {
        if let Some(value) = partial.value(field) {
            merged.set_value(field, value);
            errors.set(field, validation::validate_lab_field(field, value));
        }
    }

    (merged, errors)
}

/// Instruction sent alongside the document.
pub fn extraction_prompt() -> &'static str {
    "Extract the following laboratory values from the attached report of a chronic kidney \
disease patient, converting to the listed units when necessary: eGFR (mL/min/1.73m²), \
hemoglobin (g/dL), ferritin (ng/mL), transferrin saturation (%), total calcium (mg/dL), \
phosphorus (mg/dL), PTH (pg/mL) and alkaline phosphatase (U/L). Also report the CKD stage \
(3a, 3b, 4, 5 or 5D) and dialysis type (Hemodialysis, Peritoneal Dialysis or None) if stated. \
Omit any value that is not present in the document; never guess."
}

/// Response schema for extraction: every property optional.
pub fn extraction_schema() -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        "ckdStage".into(),
        json!({ "type": "STRING", "enum": ["3a", "3b", "4", "5", "5D"] }),
    );
    properties.insert(
        "dialysisType".into(),
        json!({ "type": "STRING", "enum": ["Hemodialysis", "Peritoneal Dialysis", "None"] }),
    );
    for field in LabField::ALL {
        let range = validation::range_for(field);
        properties.insert(
            field.name().into(),
            json!({ "type": "NUMBER", "description": format!("{} in {}", field.label(), range.unit) }),
        );
    }
    json!({ "type": "OBJECT", "properties": properties })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_copies_present_fields_only() {
        let partial = PartialLabRecord {
            dialysis_type: Some(DialysisType::None),
            ckd_stage: Some(CkdStage::Stage4),
            hemoglobin: Some(11.2),
            pth: Some(280.0),
            ..PartialLabRecord::default()
        };

        let (merged, errors) = merge_extracted(PatientLabRecord::default(), &partial);
        assert_eq!(merged.dialysis_type, DialysisType::None);
        assert_eq!(merged.ckd_stage, CkdStage::Stage4);
        assert_eq!(merged.hemoglobin, 11.2);
        assert_eq!(merged.pth, 280.0);
        // Untouched fields keep the seed values.
        assert_eq!(merged.ferritin, 80.0);
        assert!(errors.is_clear());
    }

    #[test]
    fn merge_flags_out_of_range_guesses() {
        let partial = PartialLabRecord {
            // Creatinine misread as eGFR, ferritin reported in the wrong unit.
            egfr: Some(0.8),
            ferritin: Some(8.0),
            ..PartialLabRecord::default()
        };

        let (merged, errors) = merge_extracted(PatientLabRecord::default(), &partial);
        assert_eq!(merged.egfr, Some(0.8));
        assert_eq!(errors.get(LabField::Egfr), Some("1 - 200 mL/min"));
        assert_eq!(errors.get(LabField::Ferritin), Some("10 - 5000 ng/mL"));
        assert!(!validation::form_is_valid(&merged, &errors));
    }

    #[test]
    fn parses_sparse_extractor_output() {
        let partial: PartialLabRecord =
            serde_json::from_str(r#"{"tsat": 17, "ckdStage": "5D"}"#).expect("parse");
        assert_eq!(partial.tsat, Some(17.0));
        assert_eq!(partial.ckd_stage, Some(CkdStage::Stage5D));
        assert_eq!(partial.calcium, None);
    }

    #[test]
    fn schema_lists_every_field() {
        let schema = extraction_schema();
        for field in LabField::ALL {
            assert_eq!(schema["properties"][field.name()]["type"], "NUMBER");
        }
        assert!(schema.get("required").is_none());
    }
}
