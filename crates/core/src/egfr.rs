//! eGFR estimation (CKD-EPI 2021, race-free, creatinine-based) and stage suggestion.
//!
//! The estimator is a pure function of serum creatinine, age and sex. The dialysis override is
//! applied separately by [`final_stage`], which takes the record's stage and dialysis type as they
//! were *before* the estimate is written back.

use crate::constants::{
    ALPHA_FEMALE, ALPHA_MALE, CKD_EPI_AGE_BASE, CKD_EPI_CONSTANT, CKD_EPI_MAX_EXPONENT,
    KAPPA_FEMALE, KAPPA_MALE, SEX_FACTOR_FEMALE, SEX_FACTOR_MALE,
};
use crate::record::{CkdStage, DialysisType, PatientLabRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    fn kappa(self) -> f64 {
        match self {
            Sex::Female => KAPPA_FEMALE,
            Sex::Male => KAPPA_MALE,
        }
    }

    fn alpha(self) -> f64 {
        match self {
            Sex::Female => ALPHA_FEMALE,
            Sex::Male => ALPHA_MALE,
        }
    }

    fn factor(self) -> f64 {
        match self {
            Sex::Female => SEX_FACTOR_FEMALE,
            Sex::Male => SEX_FACTOR_MALE,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => f.write_str("male"),
            Sex::Female => f.write_str("female"),
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            _ => Err(format!("unknown sex: '{s}' (expected male or female)")),
        }
    }
}

/// Transient calculator input. Not persisted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatinineInput {
    /// Serum creatinine, mg/dL.
    pub creatinine: f64,
    /// Years.
    pub age: f64,
    pub sex: Sex,
}

impl CreatinineInput {
    /// Creatinine and age must both be positive (and finite) for the equation to apply.
    pub fn is_computable(&self) -> bool {
        self.creatinine.is_finite() && self.age.is_finite() && self.creatinine > 0.0 && self.age > 0.0
    }
}

/// Result of a successful estimate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EgfrEstimate {
    /// mL/min/1.73m², rounded to one decimal place.
    pub egfr: f64,
    /// `None` when eGFR is 60 or above, where no stage 3-5 applies.
    pub suggested_stage: Option<CkdStage>,
}

/// Estimates eGFR and suggests a stage.
///
/// Returns `None` without computing anything when creatinine or age is not positive.
pub fn estimate_egfr(input: &CreatinineInput) -> Option<EgfrEstimate> {
    if !input.is_computable() {
        return None;
    }

    let ratio = input.creatinine / input.sex.kappa();
    let min_ratio = ratio.min(1.0);
    let max_ratio = ratio.max(1.0);

    let raw = CKD_EPI_CONSTANT
        * min_ratio.powf(input.sex.alpha())
        * max_ratio.powf(CKD_EPI_MAX_EXPONENT)
        * CKD_EPI_AGE_BASE.powf(input.age)
        * input.sex.factor();

    let egfr = round_one_decimal(raw);

    Some(EgfrEstimate {
        egfr,
        suggested_stage: suggest_stage(egfr),
    })
}

/// Rounds half away from zero at one decimal place.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Maps an eGFR onto a stage using half-open intervals, upper bound exclusive.
pub fn suggest_stage(egfr: f64) -> Option<CkdStage> {
    if (45.0..60.0).contains(&egfr) {
        Some(CkdStage::Stage3a)
    } else if (30.0..45.0).contains(&egfr) {
        Some(CkdStage::Stage3b)
    } else if (15.0..30.0).contains(&egfr) {
        Some(CkdStage::Stage4)
    } else if egfr < 15.0 {
        Some(CkdStage::Stage5)
    } else {
        None
    }
}

/// Decides the stage to write back.
///
/// `prior_stage` and `prior_dialysis` must be the record's values before the write-back. A
/// patient on dialysis, or already staged 5D, stays 5D whatever the estimate says. Without a
/// suggestion (eGFR >= 60) the prior stage is kept.
pub fn final_stage(
    prior_stage: CkdStage,
    prior_dialysis: DialysisType,
    suggested: Option<CkdStage>,
) -> CkdStage {
    if prior_dialysis.is_on_dialysis() || prior_stage == CkdStage::Stage5D {
        return CkdStage::Stage5D;
    }
    suggested.unwrap_or(prior_stage)
}

/// Runs the estimator and returns the record with `egfr` and `ckd_stage` written back.
///
/// When the input is not computable the record is returned unchanged.
pub fn apply_estimate(record: PatientLabRecord, input: &CreatinineInput) -> PatientLabRecord {
    let Some(estimate) = estimate_egfr(input) else {
        return record;
    };

    let stage = final_stage(
        record.ckd_stage,
        record.dialysis_type,
        estimate.suggested_stage,
    );

    PatientLabRecord {
        egfr: Some(estimate.egfr),
        ckd_stage: stage,
        ..record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(creatinine: f64, age: f64, sex: Sex) -> CreatinineInput {
        CreatinineInput {
            creatinine,
            age,
            sex,
        }
    }

    fn non_dialysis_record(stage: CkdStage) -> PatientLabRecord {
        PatientLabRecord {
            ckd_stage: stage,
            dialysis_type: DialysisType::None,
            ..PatientLabRecord::default()
        }
    }

    #[test]
    fn male_reference_case_lands_near_seventy() {
        let estimate = estimate_egfr(&input(1.2, 60.0, Sex::Male)).expect("computable");
        assert_eq!(estimate.egfr, 69.2);
        assert!((68.0..72.0).contains(&estimate.egfr));
        assert_eq!(estimate.suggested_stage, None);
    }

    #[test]
    fn creatinine_equal_to_kappa_collapses_piecewise_terms() {
        // min and max ratios are both 1, leaving 142 * 0.9938^age * sex factor.
        let female = estimate_egfr(&input(0.7, 50.0, Sex::Female)).expect("computable");
        let expected = (142.0 * 0.9938_f64.powf(50.0) * 1.012 * 10.0).round() / 10.0;
        assert_eq!(female.egfr, expected);
        assert_eq!(female.egfr, 105.3);

        let male = estimate_egfr(&input(0.9, 40.0, Sex::Male)).expect("computable");
        assert_eq!(male.egfr, 110.7);
    }

    #[test]
    fn suggests_stages_across_the_range() {
        let cases = [
            (input(1.5, 70.0, Sex::Male), 49.8, Some(CkdStage::Stage3a)),
            (input(2.2, 55.0, Sex::Male), 34.5, Some(CkdStage::Stage3b)),
            (input(2.0, 65.0, Sex::Female), 27.2, Some(CkdStage::Stage4)),
            (input(5.0, 70.0, Sex::Male), 11.7, Some(CkdStage::Stage5)),
        ];
        for (case, egfr, stage) in cases {
            let estimate = estimate_egfr(&case).expect("computable");
            assert_eq!(estimate.egfr, egfr, "{case:?}");
            assert_eq!(estimate.suggested_stage, stage, "{case:?}");
        }
    }

    #[test]
    fn low_creatinine_uses_alpha_exponent() {
        let estimate = estimate_egfr(&input(0.5, 30.0, Sex::Female)).expect("computable");
        assert_eq!(estimate.egfr, 129.3);
    }

    #[test]
    fn is_deterministic() {
        let case = input(1.8, 60.0, Sex::Female);
        let first = estimate_egfr(&case);
        for _ in 0..10 {
            assert_eq!(estimate_egfr(&case), first);
        }
    }

    #[test]
    fn stage_boundaries_are_upper_exclusive() {
        assert_eq!(suggest_stage(60.0), None);
        assert_eq!(suggest_stage(59.9), Some(CkdStage::Stage3a));
        assert_eq!(suggest_stage(45.0), Some(CkdStage::Stage3a));
        assert_eq!(suggest_stage(44.9), Some(CkdStage::Stage3b));
        assert_eq!(suggest_stage(30.0), Some(CkdStage::Stage3b));
        assert_eq!(suggest_stage(29.9), Some(CkdStage::Stage4));
        assert_eq!(suggest_stage(15.0), Some(CkdStage::Stage4));
        assert_eq!(suggest_stage(14.9), Some(CkdStage::Stage5));
        assert_eq!(suggest_stage(0.0), Some(CkdStage::Stage5));
    }

    #[test]
    fn non_positive_inputs_are_not_computed() {
        assert_eq!(estimate_egfr(&input(0.0, 60.0, Sex::Male)), None);
        assert_eq!(estimate_egfr(&input(-1.0, 60.0, Sex::Male)), None);
        assert_eq!(estimate_egfr(&input(1.2, 0.0, Sex::Male)), None);
        assert_eq!(estimate_egfr(&input(1.2, -3.0, Sex::Female)), None);
        assert_eq!(estimate_egfr(&input(f64::NAN, 60.0, Sex::Female)), None);
    }

    #[test]
    fn apply_estimate_is_a_no_op_for_invalid_input() {
        let record = non_dialysis_record(CkdStage::Stage4);
        let updated = apply_estimate(record.clone(), &input(0.0, 60.0, Sex::Male));
        assert_eq!(updated, record);
    }

    #[test]
    fn dialysis_forces_stage_5d_but_still_writes_egfr() {
        let record = PatientLabRecord {
            ckd_stage: CkdStage::Stage4,
            dialysis_type: DialysisType::Hemodialysis,
            ..PatientLabRecord::default()
        };
        // eGFR 49.8 would suggest 3a.
        let updated = apply_estimate(record, &input(1.5, 70.0, Sex::Male));
        assert_eq!(updated.egfr, Some(49.8));
        assert_eq!(updated.ckd_stage, CkdStage::Stage5D);
    }

    #[test]
    fn existing_5d_stage_is_kept_without_dialysis() {
        assert_eq!(
            final_stage(CkdStage::Stage5D, DialysisType::None, Some(CkdStage::Stage3a)),
            CkdStage::Stage5D
        );
        assert_eq!(
            final_stage(
                CkdStage::Stage3a,
                DialysisType::PeritonealDialysis,
                Some(CkdStage::Stage3a)
            ),
            CkdStage::Stage5D
        );
    }

    #[test]
    fn writes_suggested_stage_when_not_on_dialysis() {
        let updated = apply_estimate(
            non_dialysis_record(CkdStage::Stage5),
            &input(2.0, 65.0, Sex::Female),
        );
        assert_eq!(updated.egfr, Some(27.2));
        assert_eq!(updated.ckd_stage, CkdStage::Stage4);
    }

    #[test]
    fn high_egfr_keeps_prior_stage() {
        let updated = apply_estimate(
            non_dialysis_record(CkdStage::Stage3a),
            &input(1.2, 60.0, Sex::Male),
        );
        assert_eq!(updated.egfr, Some(69.2));
        assert_eq!(updated.ckd_stage, CkdStage::Stage3a);
    }

    #[test]
    fn parses_sex() {
        assert_eq!("Female".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!("m".parse::<Sex>().unwrap(), Sex::Male);
        assert!("x".parse::<Sex>().is_err());
    }
}
