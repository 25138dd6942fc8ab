//! `generateContent` request bodies and response parsing.

use crate::{GeminiError, GeminiResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use drc_core::analysis::{self, PCDT_CONTEXT};
use drc_core::extraction;
use drc_core::{AnalysisResult, PartialLabRecord, PatientLabRecord, UploadedDocument};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Body for a structured analysis of `record` against the guideline text.
pub fn analysis_request(record: &PatientLabRecord) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": analysis::system_instruction(PCDT_CONTEXT) }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": analysis::build_patient_prompt(record) }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": analysis::response_schema()
        }
    })
}

/// Body asking the model to read lab values out of an uploaded document.
pub fn extraction_request(document: &UploadedDocument) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": document.mime_type,
                        "data": STANDARD.encode(&document.data)
                    }
                },
                { "text": extraction::extraction_prompt() }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": extraction::extraction_schema()
        }
    })
}

/// Text of the first part of the first candidate.
pub fn response_text(response: &Value) -> GeminiResult<&str> {
    response["candidates"]
        .get(0)
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .ok_or(GeminiError::EmptyResponse)
}

/// Removes a surrounding markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_text<T: DeserializeOwned>(response: &Value) -> GeminiResult<T> {
    let text = strip_code_fence(response_text(response)?);
    if text.is_empty() {
        return Err(GeminiError::EmptyResponse);
    }
    serde_json::from_str(text).map_err(GeminiError::Parse)
}

pub fn parse_analysis(response: &Value) -> GeminiResult<AnalysisResult> {
    parse_text(response)
}

pub fn parse_extraction(response: &Value) -> GeminiResult<PartialLabRecord> {
    parse_text(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drc_core::CkdStage;

    fn wrap(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] }
            }]
        })
    }

    const RESULT_JSON: &str = r#"{
        "anemiaAnalysis": { "evaluation": "Hb 9.5 below target.", "recommendations": ["Iron."] },
        "mbdAnalysis": { "evaluation": "PTH high.", "recommendations": ["Calcitriol."] },
        "overallSummary": "Needs attention."
    }"#;

    #[test]
    fn analysis_request_carries_prompt_schema_and_guideline() {
        let body = analysis_request(&PatientLabRecord::default());
        let instruction = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(instruction.contains("nephrology expert"));

        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("- CKD Stage: 5D"));

        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"][2],
            "overallSummary"
        );
    }

    #[test]
    fn extraction_request_inlines_base64_document() {
        let document = UploadedDocument {
            mime_type: "application/pdf".into(),
            data: b"%PDF".to_vec(),
        };
        let body = extraction_request(&document);
        let inline = &body["contents"][0]["parts"][0]["inlineData"];
        assert_eq!(inline["mimeType"], "application/pdf");
        assert_eq!(inline["data"], "JVBERg==");
        assert!(body["contents"][0]["parts"][1]["text"]
            .as_str()
            .unwrap()
            .contains("never guess"));
    }

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn parses_plain_and_fenced_analysis() {
        let plain = parse_analysis(&wrap(RESULT_JSON)).unwrap();
        let fenced = parse_analysis(&wrap(&format!("```json\n{RESULT_JSON}\n```"))).unwrap();
        assert_eq!(plain, fenced);
        assert_eq!(plain.overall_summary, "Needs attention.");
        assert_eq!(plain.mbd_analysis.recommendations, vec!["Calcitriol."]);
    }

    #[test]
    fn missing_text_is_empty_response() {
        let err = parse_analysis(&json!({ "candidates": [] })).expect_err("no candidates");
        assert!(matches!(err, GeminiError::EmptyResponse));

        let err = parse_analysis(&wrap("   ")).expect_err("blank text");
        assert!(matches!(err, GeminiError::EmptyResponse));
    }

    #[test]
    fn incomplete_result_is_parse_error() {
        let err = parse_analysis(&wrap(r#"{"overallSummary":"x"}"#)).expect_err("missing sections");
        assert!(matches!(err, GeminiError::Parse(_)));
    }

    #[test]
    fn parses_partial_extraction() {
        let partial =
            parse_extraction(&wrap(r#"{"hemoglobin": 10.2, "ckdStage": "4"}"#)).unwrap();
        assert_eq!(partial.hemoglobin, Some(10.2));
        assert_eq!(partial.ckd_stage, Some(CkdStage::Stage4));
        assert_eq!(partial.pth, None);
    }
}
