//! Patient lab record model.
//!
//! A [`PatientLabRecord`] is the value exchanged between the form, the estimator, the validator
//! and the analysis collaborator. It is a plain value: callers own it and pass it by value or
//! reference into the core, which holds no state of its own.
//!
//! Wire keys are camelCase so that records serialise to the same shape that the browser form
//! and stored history snapshots use.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clinical CKD stage. `5D` denotes dialysis dependence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CkdStage {
    #[serde(rename = "3a")]
    Stage3a,
    #[serde(rename = "3b")]
    Stage3b,
    #[serde(rename = "4")]
    Stage4,
    #[serde(rename = "5")]
    Stage5,
    #[serde(rename = "5D")]
    Stage5D,
}

impl CkdStage {
    pub const ALL: [CkdStage; 5] = [
        CkdStage::Stage3a,
        CkdStage::Stage3b,
        CkdStage::Stage4,
        CkdStage::Stage5,
        CkdStage::Stage5D,
    ];

    /// Wire/display code, e.g. `"3a"` or `"5D"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CkdStage::Stage3a => "3a",
            CkdStage::Stage3b => "3b",
            CkdStage::Stage4 => "4",
            CkdStage::Stage5 => "5",
            CkdStage::Stage5D => "5D",
        }
    }
}

impl fmt::Display for CkdStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CkdStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CkdStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown CKD stage: '{s}' (expected 3a, 3b, 4, 5 or 5D)"))
    }
}

/// Renal replacement therapy currently in use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialysisType {
    Hemodialysis,
    #[serde(rename = "Peritoneal Dialysis")]
    PeritonealDialysis,
    None,
}

impl DialysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialysisType::Hemodialysis => "Hemodialysis",
            DialysisType::PeritonealDialysis => "Peritoneal Dialysis",
            DialysisType::None => "None",
        }
    }

    pub fn is_on_dialysis(&self) -> bool {
        !matches!(self, DialysisType::None)
    }
}

impl fmt::Display for DialysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalised.as_str() {
            "hemodialysis" | "hd" => Ok(DialysisType::Hemodialysis),
            "peritonealdialysis" | "pd" => Ok(DialysisType::PeritonealDialysis),
            "none" => Ok(DialysisType::None),
            _ => Err(format!(
                "unknown dialysis type: '{s}' (expected Hemodialysis, Peritoneal Dialysis or None)"
            )),
        }
    }
}

/// Numeric fields of a [`PatientLabRecord`].
///
/// Every variant carries a declared acceptable range in [`crate::validation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabField {
    Egfr,
    Hemoglobin,
    Ferritin,
    Tsat,
    Calcium,
    Phosphorus,
    Pth,
    AlkalinePhosphatase,
}

impl LabField {
    pub const ALL: [LabField; 8] = [
        LabField::Egfr,
        LabField::Hemoglobin,
        LabField::Ferritin,
        LabField::Tsat,
        LabField::Calcium,
        LabField::Phosphorus,
        LabField::Pth,
        LabField::AlkalinePhosphatase,
    ];

    /// The lab panel proper, i.e. everything except eGFR.
    pub const PANEL: [LabField; 7] = [
        LabField::Hemoglobin,
        LabField::Ferritin,
        LabField::Tsat,
        LabField::Calcium,
        LabField::Phosphorus,
        LabField::Pth,
        LabField::AlkalinePhosphatase,
    ];

    /// Wire name of the field (camelCase), as used by form inputs and stored records.
    pub fn name(&self) -> &'static str {
        match self {
            LabField::Egfr => "egfr",
            LabField::Hemoglobin => "hemoglobin",
            LabField::Ferritin => "ferritin",
            LabField::Tsat => "tsat",
            LabField::Calcium => "calcium",
            LabField::Phosphorus => "phosphorus",
            LabField::Pth => "pth",
            LabField::AlkalinePhosphatase => "alkalinePhosphatase",
        }
    }

    /// Short clinical label.
    pub fn label(&self) -> &'static str {
        match self {
            LabField::Egfr => "eGFR",
            LabField::Hemoglobin => "Hemoglobin",
            LabField::Ferritin => "Ferritin",
            LabField::Tsat => "TSAT",
            LabField::Calcium => "Calcium",
            LabField::Phosphorus => "Phosphorus",
            LabField::Pth => "PTH",
            LabField::AlkalinePhosphatase => "Alkaline Phosphatase",
        }
    }

    /// Looks up a field by wire name. Returns `None` for names without a numeric field, such as
    /// `ckdStage` or `dialysisType`.
    pub fn from_name(name: &str) -> Option<LabField> {
        LabField::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for LabField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A patient's staging information and lab panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientLabRecord {
    pub ckd_stage: CkdStage,
    pub dialysis_type: DialysisType,
    /// mL/min/1.73m². Older snapshots were stored without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egfr: Option<f64>,
    /// g/dL
    pub hemoglobin: f64,
    /// ng/mL
    pub ferritin: f64,
    /// %
    pub tsat: f64,
    /// mg/dL
    pub calcium: f64,
    /// mg/dL
    pub phosphorus: f64,
    /// pg/mL
    pub pth: f64,
    /// U/L
    pub alkaline_phosphatase: f64,
}

impl Default for PatientLabRecord {
    /// Representative values for a patient on haemodialysis, used to seed a blank form.
    fn default() -> Self {
        Self {
            ckd_stage: CkdStage::Stage5D,
            dialysis_type: DialysisType::Hemodialysis,
            egfr: Some(10.0),
            hemoglobin: 9.5,
            ferritin: 80.0,
            tsat: 18.0,
            calcium: 8.8,
            phosphorus: 6.1,
            pth: 750.0,
            alkaline_phosphatase: 110.0,
        }
    }
}

impl PatientLabRecord {
    /// Current value of a numeric field; `None` only for an absent eGFR.
    pub fn value(&self, field: LabField) -> Option<f64> {
        match field {
            LabField::Egfr => self.egfr,
            LabField::Hemoglobin => Some(self.hemoglobin),
            LabField::Ferritin => Some(self.ferritin),
            LabField::Tsat => Some(self.tsat),
            LabField::Calcium => Some(self.calcium),
            LabField::Phosphorus => Some(self.phosphorus),
            LabField::Pth => Some(self.pth),
            LabField::AlkalinePhosphatase => Some(self.alkaline_phosphatase),
        }
    }

    pub fn set_value(&mut self, field: LabField, value: f64) {
        match field {
            LabField::Egfr => self.egfr = Some(value),
            LabField::Hemoglobin => self.hemoglobin = value,
            LabField::Ferritin => self.ferritin = value,
            LabField::Tsat => self.tsat = value,
            LabField::Calcium => self.calcium = value,
            LabField::Phosphorus => self.phosphorus = value,
            LabField::Pth => self.pth = value,
            LabField::AlkalinePhosphatase => self.alkaline_phosphatase = value,
        }
    }
}
