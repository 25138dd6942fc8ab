//! Analysis collaborator boundary.
//!
//! The analysis itself is produced by an external text-generation service. This module defines
//! the structured result it must return, the prompt and response schema handed to it, and the
//! submission gate that decides whether a record may be sent at all.

use crate::record::PatientLabRecord;
use crate::validation::{self, FieldErrors};
use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Clinical guideline text (Brazilian PCDT for CKD mineral-bone disorder and anaemia).
pub const PCDT_CONTEXT: &str = include_str!("../context/pcdt.md");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub evaluation: String,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub anemia_analysis: AnalysisSection,
    pub mbd_analysis: AnalysisSection,
    pub overall_summary: String,
}

impl AnalysisResult {
    /// Anaemia recommendations followed by MBD recommendations.
    pub fn all_recommendations(&self) -> impl Iterator<Item = &str> {
        self.anemia_analysis
            .recommendations
            .iter()
            .chain(self.mbd_analysis.recommendations.iter())
            .map(String::as_str)
    }
}

/// An external service that turns a validated record into an [`AnalysisResult`].
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, record: &PatientLabRecord) -> CoreResult<AnalysisResult>;
}

/// Sends a record for analysis if, and only if, it passes [`validation::form_is_valid`].
///
/// A record that fails the gate yields [`CoreError::InvalidRecord`] carrying every violation,
/// and the provider is not called. Provider failures are logged and reported as
/// [`CoreError::AnalysisFailed`].
pub async fn analyze_record<P>(
    provider: &P,
    record: &PatientLabRecord,
    errors: &FieldErrors,
) -> CoreResult<AnalysisResult>
where
    P: AnalysisProvider + ?Sized,
{
    if !validation::form_is_valid(record, errors) {
        let violations = validation::validate_record(record);
        tracing::info!(violations = violations.len(), "analysis request rejected");
        return Err(CoreError::InvalidRecord(violations));
    }

    match provider.analyze(record).await {
        Ok(result) => Ok(result),
        Err(e) => {
            tracing::error!("analysis provider failed: {}", e);
            Err(CoreError::AnalysisFailed)
        }
    }
}

fn format_egfr(egfr: Option<f64>) -> String {
    egfr.map(|v| v.to_string())
        .unwrap_or_else(|| "not provided".into())
}

/// The user prompt listing the patient's values.
pub fn build_patient_prompt(record: &PatientLabRecord) -> String {
    format!(
        "Analyze the following patient's lab results based strictly on the provided Brazilian \
PCDT context. Provide a detailed evaluation for Anemia and MBD, suggest specific therapeutic \
actions according to the guidelines, and give an overall summary.

Patient Data:
- CKD Stage: {stage}
- Dialysis Type: {dialysis}
- eGFR (TFG estimada): {egfr} mL/min/1.73m²
- Hemoglobin (g/dL): {hb}
- Ferritin (ng/mL): {ferritin}
- Transferrin Saturation (%): {tsat}
- Total Calcium (mg/dL): {calcium}
- Phosphorus (mg/dL): {phosphorus}
- PTH (pg/mL): {pth}
- Alkaline Phosphatase (U/L): {alp}
",
        stage = record.ckd_stage,
        dialysis = record.dialysis_type,
        egfr = format_egfr(record.egfr),
        hb = record.hemoglobin,
        ferritin = record.ferritin,
        tsat = record.tsat,
        calcium = record.calcium,
        phosphorus = record.phosphorus,
        pth = record.pth,
        alp = record.alkaline_phosphatase,
    )
}

/// System instruction embedding the guideline text.
pub fn system_instruction(guideline: &str) -> String {
    format!(
        "You are a nephrology expert assistant. Your task is to analyze patient lab results \
based *strictly* on the provided Brazilian Clinical Protocols and Therapeutic Guidelines (PCDT). \
Do not use any external knowledge. Provide a structured analysis and recommendations in a JSON \
format. The analysis should reference specific targets and criteria from the provided context. \
The recommendations should be actionable and based on the treatment flowcharts and guidelines in \
the context. Here is the PCDT context: {guideline}"
    )
}

fn section_schema(evaluation: &str, recommendations: &str) -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "evaluation": { "type": "STRING", "description": evaluation },
            "recommendations": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": recommendations
            }
        },
        "required": ["evaluation", "recommendations"]
    })
}

/// Response schema requiring the three result sections.
pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "anemiaAnalysis": section_schema(
                "Detailed evaluation of anemia parameters (Hemoglobin, Ferritin, TSAT) based on the provided PCDT.",
                "List of actionable recommendations for anemia management based on the PCDT."
            ),
            "mbdAnalysis": section_schema(
                "Detailed evaluation of Mineral and Bone Disorder (MBD) parameters (Calcium, Phosphorus, PTH, Alkaline Phosphatase) based on the provided PCDT.",
                "List of actionable recommendations for MBD management based on the PCDT, including medication suggestions if applicable."
            ),
            "overallSummary": {
                "type": "STRING",
                "description": "A brief overall summary of the patient's condition and the most critical points of attention."
            }
        },
        "required": ["anemiaAnalysis", "mbdAnalysis", "overallSummary"]
    })
}
