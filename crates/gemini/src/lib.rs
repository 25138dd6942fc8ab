//! # DRC Gemini
//!
//! HTTP adapter that implements the analysis and document-extraction collaborator traits of
//! `drc-core` against the Gemini `generateContent` endpoint.
//!
//! Request bodies and response parsing live in [`payload`] as pure functions; [`GeminiClient`]
//! only performs the transport.

pub mod client;
pub mod payload;

pub use client::GeminiClient;

use drc_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API_KEY environment variable not set")]
    MissingApiKey,
    #[error("request to Gemini failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gemini returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Gemini response contained no text")]
    EmptyResponse,
    #[error("failed to parse Gemini response: {0}")]
    Parse(#[source] serde_json::Error),
}

pub type GeminiResult<T> = std::result::Result<T, GeminiError>;

impl From<GeminiError> for CoreError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::MissingApiKey => CoreError::MissingApiKey,
            other => CoreError::Provider(other.to_string()),
        }
    }
}
