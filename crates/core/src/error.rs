use crate::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("record failed validation: {0}")]
    InvalidRecord(FieldErrors),
    #[error("API_KEY environment variable not set")]
    MissingApiKey,
    #[error("analysis provider error: {0}")]
    Provider(String),
    #[error("Failed to get a valid analysis from the AI model.")]
    AnalysisFailed,
    #[error("failed to serialize: {0}")]
    Serialization(serde_json::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
