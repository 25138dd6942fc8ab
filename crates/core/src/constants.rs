//! Constants used throughout the DRC core crate.
//!
//! This module keeps the CKD-EPI coefficients, configuration defaults and user-facing messages
//! in one place so they stay consistent across the estimator, validator and service layers.

/// CKD-EPI 2021 leading constant.
pub const CKD_EPI_CONSTANT: f64 = 142.0;

/// Exponent applied to `max(Scr/kappa, 1)`.
pub const CKD_EPI_MAX_EXPONENT: f64 = -1.200;

/// Per-year age decay factor.
pub const CKD_EPI_AGE_BASE: f64 = 0.9938;

pub const KAPPA_FEMALE: f64 = 0.7;
pub const KAPPA_MALE: f64 = 0.9;
pub const ALPHA_FEMALE: f64 = -0.241;
pub const ALPHA_MALE: f64 = -0.302;
pub const SEX_FACTOR_FEMALE: f64 = 1.012;
pub const SEX_FACTOR_MALE: f64 = 1.0;

/// Default file backing the analysis history.
pub const DEFAULT_HISTORY_FILE: &str = "drc_exam_history.json";

/// Default Gemini model used for analysis and document extraction.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Message returned for unparsable numeric input.
pub const INVALID_NUMBER_MESSAGE: &str = "invalid number";

/// Message surfaced to users whenever the analysis collaborator fails.
pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to get a valid analysis from the AI model.";
