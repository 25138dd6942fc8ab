//! # DRC Core
//!
//! Core logic for the CKD lab analyser.
//!
//! This crate contains the pure computations and the collaborator boundaries:
//! - eGFR estimation (CKD-EPI 2021, race-free) and CKD stage suggestion
//! - Per-field lab range validation and the submission gate
//! - Explicitly-owned form state
//! - Analysis and document-extraction collaborator traits, prompt and schema construction
//! - JSON export of results
//!
//! **No API concerns**: HTTP servers, the Gemini client and history persistence belong in
//! `api-rest`, `drc-gemini` and `drc-history`.

pub mod analysis;
pub mod config;
pub mod constants;
pub mod egfr;
pub mod error;
pub mod export;
pub mod extraction;
pub mod form;
pub mod record;
pub mod validation;

pub use analysis::{analyze_record, AnalysisProvider, AnalysisResult, AnalysisSection};
pub use config::CoreConfig;
pub use constants::{ANALYSIS_FAILED_MESSAGE, DEFAULT_HISTORY_FILE};
pub use egfr::{apply_estimate, estimate_egfr, CreatinineInput, EgfrEstimate, Sex};
pub use error::{CoreError, CoreResult};
pub use extraction::{merge_extracted, LabExtractor, PartialLabRecord, UploadedDocument};
pub use form::LabForm;
pub use record::{CkdStage, DialysisType, LabField, PatientLabRecord};
pub use validation::{
    form_is_valid, validate_field, validate_record, FieldError, FieldErrors, LabRange,
};
