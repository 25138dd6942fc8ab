//! Request and response bodies.
//!
//! Domain types from `drc-core` and `drc-history` are embedded as-is; their OpenAPI schema is
//! declared as a plain object.

use drc_core::validation::parse_numeric;
use drc_core::{AnalysisResult, CkdStage, DialysisType, FieldErrors, PatientLabRecord, Sex};
use drc_history::{Comparison, HistoryEntry};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Calculator input plus the record's current staging.
///
/// Missing staging fields fall back to the default record (stage 5D on hemodialysis), so a
/// request without them always comes back as 5D. Send `ckdStage` and `dialysisType: "None"`
/// for a patient not on dialysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateEgfrReq {
    pub creatinine: f64,
    pub age: f64,
    #[schema(value_type = String, example = "male")]
    pub sex: Sex,
    /// Defaults to 5D when absent.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "4")]
    pub ckd_stage: Option<CkdStage>,
    /// Defaults to Hemodialysis when absent.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "None")]
    pub dialysis_type: Option<DialysisType>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateEgfrRes {
    pub egfr: f64,
    #[schema(value_type = Option<String>)]
    pub suggested_stage: Option<CkdStage>,
    /// Stage after the dialysis override.
    #[schema(value_type = String)]
    pub ckd_stage: CkdStage,
}

/// A raw form value: a JSON number or the text typed into the input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldInput {
    Number(f64),
    Text(String),
}

impl FieldInput {
    /// Text that does not parse becomes NaN, which the validator reports as "invalid number".
    pub fn as_number(&self) -> f64 {
        match self {
            FieldInput::Number(n) => *n,
            FieldInput::Text(s) => parse_numeric(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidateFieldReq {
    /// Wire name, e.g. `hemoglobin` or `alkalinePhosphatase`.
    pub field: String,
    #[schema(value_type = String, example = "9.5")]
    pub value: FieldInput,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidateFieldRes {
    pub field: String,
    pub valid: bool,
    /// Empty when valid.
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidateRecordRes {
    pub valid: bool,
    #[schema(value_type = Object)]
    pub errors: FieldErrors,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeRes {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[schema(value_type = Object)]
    pub result: AnalysisResult,
}

/// Body returned when a record is refused for analysis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InvalidRecordRes {
    pub message: String,
    #[schema(value_type = Object)]
    pub errors: FieldErrors,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractReq {
    pub mime_type: String,
    /// Document bytes, base64 encoded.
    pub data: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExtractRes {
    #[schema(value_type = Object)]
    pub record: PatientLabRecord,
    #[schema(value_type = Object)]
    pub errors: FieldErrors,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryListRes {
    #[schema(value_type = Vec<Object>)]
    pub entries: Vec<HistoryEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeleteRes {
    pub deleted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompareQuery {
    /// Id of one entry.
    pub a: String,
    /// Id of the other entry.
    pub b: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompareRes {
    #[schema(value_type = Object)]
    pub comparison: Comparison,
}
