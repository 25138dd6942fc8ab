use crate::payload;
use crate::{GeminiError, GeminiResult};
use async_trait::async_trait;
use drc_core::{
    AnalysisProvider, AnalysisResult, CoreConfig, CoreResult, LabExtractor, PartialLabRecord,
    PatientLabRecord, UploadedDocument,
};
use serde_json::Value;

/// Gemini `generateContent` client.
///
/// Built once from [`CoreConfig`]. A client without an API key is valid to construct; every call
/// then fails with [`GeminiError::MissingApiKey`].
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GeminiClient {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.gemini_base_url().to_string(),
            model: cfg.gemini_model().to_string(),
            api_key: cfg.api_key().map(str::to_string),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate(&self, body: &Value) -> GeminiResult<Value> {
        let key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;

        tracing::info!("calling Gemini model {}", self.model);
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", key)])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Gemini returned {}: {}", status, body);
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn analyze_record(&self, record: &PatientLabRecord) -> GeminiResult<AnalysisResult> {
        let response = self.generate(&payload::analysis_request(record)).await?;
        payload::parse_analysis(&response)
    }

    pub async fn extract_document(
        &self,
        document: &UploadedDocument,
    ) -> GeminiResult<PartialLabRecord> {
        tracing::debug!(
            "extracting lab values from {} ({} bytes)",
            document.mime_type,
            document.data.len()
        );
        let response = self.generate(&payload::extraction_request(document)).await?;
        payload::parse_extraction(&response)
    }
}

#[async_trait]
impl AnalysisProvider for GeminiClient {
    async fn analyze(&self, record: &PatientLabRecord) -> CoreResult<AnalysisResult> {
        Ok(self.analyze_record(record).await?)
    }
}

#[async_trait]
impl LabExtractor for GeminiClient {
    async fn extract(&self, document: &UploadedDocument) -> CoreResult<PartialLabRecord> {
        Ok(self.extract_document(document).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drc_core::CoreError;

    fn config(api_key: Option<&str>) -> CoreConfig {
        CoreConfig::from_values(
            None,
            Some("gemini-test".into()),
            Some("http://127.0.0.1:9/v1beta/".into()),
            api_key.map(str::to_string),
        )
        .expect("config")
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let client = GeminiClient::new(&config(Some("k")));
        assert_eq!(
            client.endpoint(),
            "http://127.0.0.1:9/v1beta/models/gemini-test:generateContent"
        );
        assert_eq!(client.model(), "gemini-test");
    }

    #[test]
    fn debug_redacts_key() {
        let client = GeminiClient::new(&config(Some("very-secret")));
        let debug = format!("{client:?}");
        assert!(!debug.contains("very-secret"));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = GeminiClient::new(&config(None));
        let err = client
            .analyze(&PatientLabRecord::default())
            .await
            .expect_err("no key");
        assert!(matches!(err, CoreError::MissingApiKey));

        let document = UploadedDocument {
            mime_type: "image/png".into(),
            data: vec![0, 1, 2],
        };
        let err = client.extract(&document).await.expect_err("no key");
        assert!(matches!(err, CoreError::MissingApiKey));
    }
}
